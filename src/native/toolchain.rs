use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::process::Command;

use crate::constants::ENTRY_POINT;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl CommandSpec {
    pub fn new<T: AsRef<Path>>(program: T, args: &[&str]) -> Self {
        CommandSpec {
            program: program.as_ref().into(),
            args: args.iter().map(|arg| arg.to_string()).collect(),
        }
    }

    pub fn program_name(&self) -> String {
        self.program.display().to_string()
    }

    /// Builds the command in its own process group so a timeout can take down
    /// everything it spawned.
    pub fn command(&self, cwd: &Path) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .current_dir(cwd)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .process_group(0);
        cmd
    }
}

/// Everything needed to turn a source text into a running program.
///
/// There is exactly one entry-point file per toolchain; the submitted source
/// must declare the matching public name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Toolchain {
    pub entry_file: String,
    pub compiler: CommandSpec,
    pub runtime: CommandSpec,
}

impl Toolchain {
    pub fn java<T, U>(javac_path: T, java_path: U) -> Self
    where
        T: AsRef<Path>,
        U: AsRef<Path>,
    {
        let entry_file = format!("{ENTRY_POINT}.java");
        Toolchain {
            compiler: CommandSpec::new(javac_path, &[&entry_file]),
            runtime: CommandSpec::new(java_path, &["-cp", ".", ENTRY_POINT]),
            entry_file,
        }
    }
}
