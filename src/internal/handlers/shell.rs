//! Handler for commands declared in TOML files.
//!
//! The declared `run` template is expanded with the bound arguments and
//! executed with `/bin/sh` in the tree root. Standard streams are
//! inherited, so the command's own output goes straight to the terminal.

use std::{
    path::{Path, PathBuf},
    process::ExitStatus,
};

use anyhow::{Context, anyhow, bail};
use async_trait::async_trait;
use tokio::{process::Command, time::Duration};

use crate::internal::{
    binder::ParsedArguments,
    context::ApplicationContext,
    registry::{CommandHandler, HandlerError, HandlerResult},
};

/// Interpreter for expanded templates; values are quoted for POSIX sh.
const SHELL: &str = "/bin/sh";

/// Placeholder for the source-tree root.
pub const ROOT_PLACEHOLDER: &str = "root";
/// Placeholder for the trailing positional arguments.
pub const ARGS_PLACEHOLDER: &str = "args";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Root,
    Trailing,
    Argument(String),
}

/// A parsed `run` template such as `make -C {root} {target} {args}`.
///
/// `{{` and `}}` stand for literal braces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandTemplate {
    segments: Vec<Segment>,
}

impl CommandTemplate {
    /// Parse `source`, accepting `{root}`, `{args}` and the names in `arguments`.
    pub fn parse(source: &str, arguments: &[&str]) -> anyhow::Result<Self> {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut chars = source.chars().peekable();

        while let Some(c) = chars.next() {
            match c {
                '{' if chars.peek() == Some(&'{') => {
                    chars.next();
                    literal.push('{');
                }
                '}' if chars.peek() == Some(&'}') => {
                    chars.next();
                    literal.push('}');
                }
                '{' => {
                    let mut name = String::new();
                    loop {
                        match chars.next() {
                            Some('}') => break,
                            Some(ch) => name.push(ch),
                            None => bail!("unterminated placeholder '{{{name}' in '{source}'"),
                        }
                    }
                    let segment = match name.as_str() {
                        ROOT_PLACEHOLDER => Segment::Root,
                        ARGS_PLACEHOLDER => Segment::Trailing,
                        arg if arguments.contains(&arg) => Segment::Argument(name.clone()),
                        _ => bail!("unknown placeholder '{{{name}}}' in '{source}'"),
                    };
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(segment);
                }
                '}' => bail!("unmatched '}}' in '{source}'"),
                other => literal.push(other),
            }
        }
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }
        Ok(Self { segments })
    }

    /// Substitute shell-quoted values for every placeholder.
    ///
    /// Absent optional arguments expand to nothing.
    pub fn expand(&self, root: &Path, args: &ParsedArguments) -> anyhow::Result<String> {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Root => out.push_str(&quote(&root.to_string_lossy())?),
                Segment::Trailing => {
                    let quoted = args
                        .trailing()
                        .iter()
                        .map(|token| quote(token))
                        .collect::<anyhow::Result<Vec<_>>>()?;
                    out.push_str(&quoted.join(" "));
                }
                Segment::Argument(name) => {
                    if let Some(value) = args.get(name) {
                        out.push_str(&quote(&value.to_string())?);
                    }
                }
            }
        }
        Ok(out)
    }
}

fn quote(value: &str) -> anyhow::Result<String> {
    shlex::try_quote(value)
        .map(|quoted| quoted.into_owned())
        .map_err(|e| anyhow!("cannot quote '{value}': {e}"))
}

/// Runs an expanded template through the shell.
#[derive(Debug, Clone)]
pub struct ShellHandler {
    template: CommandTemplate,
    /// Working directory relative to the root.
    cwd: Option<PathBuf>,
    timeout: Option<Duration>,
}

impl ShellHandler {
    pub fn new(template: CommandTemplate) -> Self {
        Self {
            template,
            cwd: None,
            timeout: None,
        }
    }

    pub fn with_cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

#[async_trait]
impl CommandHandler for ShellHandler {
    async fn handle(&self, ctx: &ApplicationContext, args: &ParsedArguments) -> HandlerResult {
        let command = self.template.expand(ctx.root(), args)?;
        let cwd = match &self.cwd {
            Some(dir) => ctx.root().join(dir),
            None => ctx.root().to_path_buf(),
        };
        tracing::debug!(command = %command, cwd = %cwd.display(), "running shell command");

        let status = run_shell(&command, &cwd, self.timeout).await?;
        match status.code() {
            Some(0) => Ok(()),
            Some(code) => Err(HandlerError::Exit(code)),
            None => Err(anyhow!("'{command}' was terminated by a signal").into()),
        }
    }
}

async fn run_shell(command: &str, cwd: &Path, timeout: Option<Duration>) -> anyhow::Result<ExitStatus> {
    let mut child = Command::new(SHELL)
        .arg("-c")
        .arg(command)
        .current_dir(cwd)
        .kill_on_drop(true)
        .spawn()
        .with_context(|| format!("failed to spawn {SHELL} in {}", cwd.display()))?;

    let Some(limit) = timeout else {
        return child.wait().await.context("failed to wait for shell");
    };
    match tokio::time::timeout(limit, child.wait()).await {
        Ok(status) => status.context("failed to wait for shell"),
        Err(_) => {
            // Kill the process and reap it before reporting.
            if let Err(e) = child.kill().await {
                tracing::debug!(error = %e, "failed to kill timed-out shell");
            }
            bail!("'{command}' timed out after {limit:?}")
        }
    }
}
