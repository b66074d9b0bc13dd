use std::process::Stdio;
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::runtime::{Builder, Handle};
use tracing::{debug, warn};

use crate::errors::ResolverError;
use crate::page::RenderedPage;

/// External collaborator turning an HTML snapshot into an AX tree plus element index.
///
/// Rendering is blocking and usually the slowest part of converting a web episode.
pub trait PageRenderer: Send + Sync {
    fn render(&self, html: &str) -> Result<RenderedPage, ResolverError>;
}

impl<R: PageRenderer + ?Sized> PageRenderer for Box<R> {
    fn render(&self, html: &str) -> Result<RenderedPage, ResolverError> {
        (**self).render(html)
    }
}

impl<R: PageRenderer + ?Sized> PageRenderer for std::sync::Arc<R> {
    fn render(&self, html: &str) -> Result<RenderedPage, ResolverError> {
        (**self).render(html)
    }
}

/// Stand-in used when a dataset configures no renderer: every build fails softly.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledRenderer;

impl PageRenderer for DisabledRenderer {
    fn render(&self, _html: &str) -> Result<RenderedPage, ResolverError> {
        Err(ResolverError::renderer("no page renderer configured"))
    }
}

/// Renderer that shells out to a program (typically a headless-browser script).
///
/// The HTML is written to the child's stdin; the child must print a JSON
/// [`RenderedPage`] on stdout and exit with status zero.
#[derive(Debug, Clone)]
pub struct CommandRenderer {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl CommandRenderer {
    pub fn new(program: impl Into<String>, args: Vec<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            args,
            timeout,
        }
    }

    /// Build from a command line split into words, e.g. `["node", "render.js"]`.
    pub fn from_argv(argv: &[String], timeout: Duration) -> Result<Self, ResolverError> {
        let (program, args) = argv
            .split_first()
            .ok_or_else(|| ResolverError::renderer("renderer command is empty"))?;
        Ok(Self::new(program.clone(), args.to_vec(), timeout))
    }

    pub fn program(&self) -> &str {
        &self.program
    }
}

impl CommandRenderer {
    async fn run(&self, html: &str) -> Result<RenderedPage, ResolverError> {
        debug!(program = %self.program, bytes = html.len(), "rendering page snapshot");
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|err| ResolverError::renderer(format!("spawn {}: {err}", self.program)))?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| ResolverError::renderer("renderer stdin unavailable"))?;
        let feed = async move {
            let written = stdin.write_all(html.as_bytes()).await;
            drop(stdin);
            written
        };

        // stdout and stderr are drained together while stdin is fed; a timeout
        // drops the child, which kills it
        let (fed, output) =
            match tokio::time::timeout(self.timeout, async { tokio::join!(feed, child.wait_with_output()) })
                .await
            {
                Ok(done) => done,
                Err(_) => {
                    warn!(program = %self.program, "page renderer timed out");
                    return Err(ResolverError::Timeout(self.timeout.as_millis() as u64));
                }
            };

        if let Err(err) = fed {
            debug!(?err, "renderer closed stdin early");
        }
        let output = output.map_err(|err| ResolverError::renderer(format!("wait: {err}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ResolverError::renderer(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                stderr.trim()
            )));
        }

        serde_json::from_slice(&output.stdout)
            .map_err(|err| ResolverError::renderer(format!("invalid renderer output: {err}")))
    }
}

impl PageRenderer for CommandRenderer {
    /// Inside a tokio runtime this must be called from a blocking thread
    /// (`spawn_blocking`); outside one, a private current-thread runtime is used.
    fn render(&self, html: &str) -> Result<RenderedPage, ResolverError> {
        match Handle::try_current() {
            Ok(handle) => handle.block_on(self.run(html)),
            Err(_) => Builder::new_current_thread()
                .enable_all()
                .build()
                .map_err(|err| ResolverError::renderer(format!("renderer runtime: {err}")))?
                .block_on(self.run(html)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_renderer_always_fails() {
        let err = DisabledRenderer.render("<html></html>").unwrap_err();
        assert_eq!(err.kind(), "renderer");
    }

    #[test]
    fn empty_argv_is_rejected() {
        let err = CommandRenderer::from_argv(&[], Duration::from_secs(1)).unwrap_err();
        assert_eq!(err.kind(), "renderer");
    }

    #[test]
    fn missing_program_is_a_renderer_error() {
        let renderer = CommandRenderer::new(
            "definitely-not-a-real-renderer-binary",
            Vec::new(),
            Duration::from_secs(1),
        );
        let err = renderer.render("<html></html>").unwrap_err();
        assert!(matches!(err, ResolverError::Renderer(_)));
    }

    #[cfg(unix)]
    #[test]
    fn parses_json_printed_by_the_program() {
        let script = r#"cat > /dev/null; printf '{"axtree":"[1] link \"Home\"","elements":[{"bid":"1","xpath":"/html/body/a"}]}'"#;
        let renderer = CommandRenderer::new(
            "sh",
            vec!["-c".to_string(), script.to_string()],
            Duration::from_secs(5),
        );
        let page = renderer.render("<a>Home</a>").unwrap();
        assert_eq!(page.axtree, "[1] link \"Home\"");
        assert_eq!(page.elements[0].bid, "1");
    }

    #[cfg(unix)]
    #[test]
    fn slow_program_times_out() {
        let renderer = CommandRenderer::new(
            "sh",
            vec!["-c".to_string(), "cat > /dev/null; sleep 5".to_string()],
            Duration::from_millis(200),
        );
        let err = renderer.render("<html></html>").unwrap_err();
        assert_eq!(err, ResolverError::Timeout(200));
    }

    #[cfg(unix)]
    #[test]
    fn heavy_stderr_does_not_stall_the_program() {
        let script = r#"cat > /dev/null; head -c 200000 /dev/zero | tr '\0' x >&2; printf '{"axtree":"ok","elements":[]}'"#;
        let renderer = CommandRenderer::new(
            "sh",
            vec!["-c".to_string(), script.to_string()],
            Duration::from_secs(5),
        );
        let page = renderer.render("<html></html>").unwrap();
        assert_eq!(page.axtree, "ok");
    }

    #[cfg(unix)]
    #[tokio::test(flavor = "multi_thread")]
    async fn renders_from_the_blocking_pool() {
        let script = r#"cat > /dev/null; printf '{"axtree":"pooled","elements":[]}'"#;
        let renderer = CommandRenderer::new(
            "sh",
            vec!["-c".to_string(), script.to_string()],
            Duration::from_secs(5),
        );
        let page = tokio::task::spawn_blocking(move || renderer.render("<p></p>"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(page.axtree, "pooled");
    }
}
