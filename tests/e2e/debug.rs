//! Tests for -d tools and flag errors.

use super::*;

fn write_tree(space: &TestSpace) -> anyhow::Result<()> {
    space.write("main.c", "#include \"a.h\"\n#include \"b.h\"\n")?;
    space.write("a.h", "#include \"common.h\"\n")?;
    space.write("b.h", "#include \"common.h\"\n")?;
    space.write("common.h", "")?;
    Ok(())
}

#[test]
fn list() -> anyhow::Result<()> {
    let space = TestSpace::new()?;
    let out = space.run(&mut depscan_command(vec!["-d", "list"]))?;
    assert_eq!(out.status.code(), Some(1));
    assert_output_contains(&out, "debug tools:");
    assert_output_contains(&out, "includes");
    Ok(())
}

#[test]
fn includes() -> anyhow::Result<()> {
    let space = TestSpace::new()?;
    write_tree(&space)?;
    let out = space.run_expect(&mut depscan_command(vec!["-d", "includes", "main.c"]))?;
    assert_eq!(
        stdout(&out),
        "+-main.c
  +-a.h
  | +-common.h
  +-b.h
    +-common.h
"
    );
    Ok(())
}

#[test]
fn pruned_tree() -> anyhow::Result<()> {
    let space = TestSpace::new()?;
    write_tree(&space)?;
    let out = space.run_expect(&mut depscan_command(vec!["-d", "tree", "main.c"]))?;
    assert_output_contains(&out, "    +-[common.h]\n");
    Ok(())
}

#[test]
fn trace() -> anyhow::Result<()> {
    let space = TestSpace::new()?;
    write_tree(&space)?;
    space.run_expect(&mut depscan_command(vec!["-d", "trace", "main.c"]))?;
    let trace = std::fs::read_to_string(space.path().join("trace.json"))?;
    assert!(trace.contains("\"name\": \"scan_all\""), "{}", trace);
    Ok(())
}

#[test]
fn bad_flags() -> anyhow::Result<()> {
    let space = TestSpace::new()?;
    let out = space.run(&mut depscan_command(vec!["-d", "bogus", "a.c"]))?;
    assert_eq!(out.status.code(), Some(1));
    assert_output_contains(&out, "depscan: error: unknown -d \"bogus\"");

    let out = space.run(&mut depscan_command(vec!["-W", "bogus", "a.c"]))?;
    assert_output_contains(&out, "depscan: error: unknown -W \"bogus\"");

    let out = space.run(&mut depscan_command(vec![]))?;
    assert_output_contains(&out, "depscan: error: no targets specified");
    Ok(())
}
