//! Scanning real directories through the command line.

use super::*;

#[test]
fn basic() -> anyhow::Result<()> {
    let space = TestSpace::new()?;
    space.write("src/main.c", "#include \"util.h\"\n#include <lib.h>\n")?;
    space.write("src/util.h", "")?;
    space.write("inc/lib.h", "")?;

    let out = space.run_expect(&mut depscan_command(vec!["-I", "inc", "src/main.c"]))?;
    assert_eq!(stdout(&out), "src/main.c: inc/lib.h src/util.h\n");
    Ok(())
}

#[test]
fn first_directory_wins() -> anyhow::Result<()> {
    let space = TestSpace::new()?;
    space.write("a.c", "#include <x.h>\n")?;
    space.write("inc1/x.h", "")?;
    space.write("inc2/x.h", "")?;

    let out = space.run_expect(&mut depscan_command(vec!["-I", "inc2", "-I", "inc1", "a.c"]))?;
    assert_eq!(stdout(&out), "a.c: inc2/x.h\n");
    let out = space.run_expect(&mut depscan_command(vec!["-I", "inc1", "-I", "inc2", "a.c"]))?;
    assert_eq!(stdout(&out), "a.c: inc1/x.h\n");
    Ok(())
}

#[test]
fn search_path_from_env() -> anyhow::Result<()> {
    let space = TestSpace::new()?;
    space.write("a.c", "#include <x.h>\n")?;
    space.write("inc/x.h", "")?;

    let mut cmd = depscan_command(vec!["a.c"]);
    cmd.env("DEPSCAN_PATH", "inc");
    let out = space.run_expect(&mut cmd)?;
    assert_eq!(stdout(&out), "a.c: inc/x.h\n");

    // -I takes precedence.
    space.write("other/x.h", "")?;
    let mut cmd = depscan_command(vec!["-I", "other", "a.c"]);
    cmd.env("DEPSCAN_PATH", "inc");
    let out = space.run_expect(&mut cmd)?;
    assert_eq!(stdout(&out), "a.c: other/x.h\n");
    Ok(())
}

#[test]
fn fortran_unresolved_warning() -> anyhow::Result<()> {
    let space = TestSpace::new()?;
    space.write("main.f", "      PROGRAM MAIN\n      INCLUDE 'a.inc'\n      INCLUDE 'b.inc'\n      END\n")?;
    space.write("a.inc", "")?;

    let out = space.run_expect(&mut depscan_command(vec!["main.f"]))?;
    assert_eq!(stdout(&out), "main.f: a.inc\n");
    assert_stderr_contains(
        &out,
        "No dependency generated for file: b.inc (included from: main.f) -- file not found",
    );

    let out = space.run_expect(&mut depscan_command(vec!["-W", "no-dependency", "main.f"]))?;
    assert_eq!(stdout(&out), "main.f: a.inc\n");
    assert_stderr_not_contains(&out, "No dependency generated");
    Ok(())
}

#[test]
fn missing_and_unscanned_targets() -> anyhow::Result<()> {
    let space = TestSpace::new()?;
    space.write("README", "#include \"a.h\"\n")?;
    space.write("a.h", "")?;

    let out = space.run_expect(&mut depscan_command(vec!["gen/out.c", "README"]))?;
    assert_eq!(stdout(&out), "gen/out.c:\nREADME:\n");
    Ok(())
}

#[test]
fn include_cycle() -> anyhow::Result<()> {
    let space = TestSpace::new()?;
    space.write("a.h", "#include \"b.h\"\n")?;
    space.write("b.h", "#include \"a.h\"\n")?;

    let out = space.run_expect(&mut depscan_command(vec!["a.h", "b.h"]))?;
    assert_eq!(stdout(&out), "a.h: b.h\nb.h: a.h\n");
    Ok(())
}

#[test]
fn chdir() -> anyhow::Result<()> {
    let space = TestSpace::new()?;
    space.write("proj/a.c", "#include \"a.h\"\n")?;
    space.write("proj/a.h", "")?;

    let out = space.run_expect(&mut depscan_command(vec!["-C", "proj", "-j", "2", "a.c"]))?;
    assert_eq!(stdout(&out), "a.c: a.h\n");
    Ok(())
}

#[test]
fn fingerprint_tracks_changes() -> anyhow::Result<()> {
    let space = TestSpace::new()?;
    space.write("a.c", "#include \"a.h\"\n")?;
    space.write("a.h", "one")?;

    let hash = |space: &TestSpace| -> anyhow::Result<String> {
        let out = space.run_expect(&mut depscan_command(vec!["-v", "a.c"]))?;
        let text = stdout(&out);
        let line = text
            .lines()
            .find(|line| line.trim_start().starts_with("hash "))
            .ok_or_else(|| anyhow::anyhow!("no hash in {:?}", text))?;
        Ok(line.to_owned())
    };

    let before = hash(&space)?;
    assert_eq!(before, hash(&space)?);

    // Same length, so only the modification time tells them apart.
    space.write("a.h", "two")?;
    let mtime = filetime::FileTime::from_unix_time(2_000_000_000, 0);
    filetime::set_file_mtime(space.path().join("a.h"), mtime)?;
    assert_ne!(before, hash(&space)?);
    Ok(())
}
