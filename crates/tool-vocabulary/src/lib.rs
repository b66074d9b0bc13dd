//! Tool vocabulary for rendered agent actions.
//!
//! Holds the fixed built-in and browser-primitive catalogs, the declarative
//! per-dataset API catalog, the optional tool manifest, and the reconciler that
//! decides which calling convention renders a recorded [`ApiAction`].
//!
//! [`ApiAction`]: episode_model::ApiAction

pub mod catalog;
pub mod errors;
pub mod manifest;
pub mod reconcile;
pub mod signature;

pub use catalog::{
    browser_primitives, builtin_tools, canonical_primitive_name, code_tool_for_language,
    BrowserPrimitive, BuiltinTool, CodeTool, CustomApi, CustomCatalog, BROWSER, EXECUTE_BASH,
    EXECUTE_IPYTHON_CELL, FINISH, STR_REPLACE_EDITOR, THINK,
};
pub use errors::VocabularyError;
pub use manifest::{ToolDeclaration, ToolManifest};
pub use reconcile::{ApiRenderMode, Convention, Reconciled, ToolVocabulary};
pub use signature::{has_element_reference, normalize_bid_alias, verify, Signature, BID, BID_ALIASES};
