//! Support code for e2e tests, which run depscan as a binary.

mod debug;
mod depfile;
mod scan;

pub fn depscan_command(args: Vec<&str>) -> std::process::Command {
    let mut cmd = std::process::Command::new(env!("CARGO_BIN_EXE_depscan"));
    cmd.args(args);
    // Keep the caller's environment from leaking into the search path.
    cmd.env_remove("DEPSCAN_PATH");
    cmd.env_remove("DEPSCAN_LOG");
    cmd
}

fn print_output(out: &std::process::Output) {
    // Gross: use print! instead of writing to stdout so Rust test
    // framework can capture it.
    print!("{}", String::from_utf8_lossy(&out.stdout));
    print!("{}", String::from_utf8_lossy(&out.stderr));
}

pub fn stdout(out: &std::process::Output) -> String {
    String::from_utf8_lossy(&out.stdout).into_owned()
}

pub fn assert_output_contains(out: &std::process::Output, text: &str) {
    let out = stdout(out);
    if !out.contains(text) {
        panic!(
            "assertion failed; expected output to contain {:?} but got:\n{}",
            text, out
        );
    }
}

pub fn assert_stderr_contains(out: &std::process::Output, text: &str) {
    let err = String::from_utf8_lossy(&out.stderr);
    if !err.contains(text) {
        panic!(
            "assertion failed; expected stderr to contain {:?} but got:\n{}",
            text, err
        );
    }
}

pub fn assert_stderr_not_contains(out: &std::process::Output, text: &str) {
    let err = String::from_utf8_lossy(&out.stderr);
    if err.contains(text) {
        panic!(
            "assertion failed; expected stderr to not contain {:?} but got:\n{}",
            text, err
        );
    }
}

/// Manages a temporary directory for invoking depscan.
pub struct TestSpace {
    dir: tempfile::TempDir,
}
impl TestSpace {
    pub fn new() -> anyhow::Result<Self> {
        let dir = tempfile::tempdir()?;
        Ok(TestSpace { dir })
    }

    /// Write a file into the working space, creating its directory.
    pub fn write(&self, path: &str, content: &str) -> std::io::Result<()> {
        let path = self.dir.path().join(path);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)
    }

    pub fn path(&self) -> &std::path::Path {
        self.dir.path()
    }

    /// Invoke depscan, returning process output.
    pub fn run(&self, cmd: &mut std::process::Command) -> std::io::Result<std::process::Output> {
        cmd.current_dir(self.dir.path()).output()
    }

    /// Like run, but also print output if the scan failed.
    pub fn run_expect(
        &self,
        cmd: &mut std::process::Command,
    ) -> anyhow::Result<std::process::Output> {
        let out = self.run(cmd)?;
        if !out.status.success() {
            print_output(&out);
            anyhow::bail!("scan failed, status {}", out.status);
        }
        Ok(out)
    }

    /// Persist the temp dir locally and abort the test.  Debugging helper.
    #[allow(dead_code)]
    pub fn eject(self) -> ! {
        panic!("ejected at {:?}", self.dir.into_path());
    }
}
