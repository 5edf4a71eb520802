use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};

/// Engine invocation under construction.
///
/// Kept separate from `tokio::process::Command` so argument vectors can be
/// inspected in tests and logged before spawning.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineCommand {
    program: OsString,
    args: Vec<OsString>,
    current_dir: Option<PathBuf>,
}

impl EngineCommand {
    pub fn new(program: impl AsRef<OsStr>) -> Self {
        Self {
            program: program.as_ref().to_os_string(),
            args: Vec::new(),
            current_dir: None,
        }
    }

    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args.extend(args.into_iter().map(|a| a.as_ref().to_os_string()));
        self
    }

    /// `--flag value`
    pub fn opt(self, flag: &str, value: impl AsRef<OsStr>) -> Self {
        self.arg(flag).arg(value)
    }

    /// Append `flag` only when `enabled`.
    pub fn flag_if(self, enabled: bool, flag: &str) -> Self {
        if enabled { self.arg(flag) } else { self }
    }

    pub fn current_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.current_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    pub fn program(&self) -> &OsStr {
        &self.program
    }

    pub fn arg_list(&self) -> &[OsString] {
        &self.args
    }

    /// Arguments as lossy strings, for logs and assertions.
    pub fn display_args(&self) -> Vec<String> {
        self.args.iter().map(|a| a.to_string_lossy().into_owned()).collect()
    }

    pub fn to_command(&self) -> tokio::process::Command {
        let mut cmd = tokio::process::Command::new(&self.program);
        cmd.args(&self.args);
        if let Some(dir) = &self.current_dir {
            cmd.current_dir(dir);
        }
        cmd
    }
}

impl std::fmt::Display for EngineCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.program.to_string_lossy())?;
        for arg in &self.args {
            write!(f, " {}", arg.to_string_lossy())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_argument_vector_in_order() {
        let cmd = EngineCommand::new("snakemake")
            .opt("--snakefile", "rule.smk")
            .opt("--cores", "2")
            .flag_if(false, "--use-conda")
            .flag_if(true, "--nocolor")
            .args(["a.txt", "b.txt"]);
        assert_eq!(
            cmd.display_args(),
            vec!["--snakefile", "rule.smk", "--cores", "2", "--nocolor", "a.txt", "b.txt"]
        );
        assert_eq!(cmd.to_string(), "snakemake --snakefile rule.smk --cores 2 --nocolor a.txt b.txt");
    }
}
