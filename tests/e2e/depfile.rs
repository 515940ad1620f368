//! Tests for merging compiler-written depfiles.

use super::*;

#[test]
fn reported_deps() -> anyhow::Result<()> {
    let space = TestSpace::new()?;
    space.write("main.c", "#include \"main.h\"\n")?;
    space.write("main.h", "")?;
    space.write("gen.h", "")?;
    space.write("main.d", "main.o: main.c \\\n  main.h gen.h\n")?;

    let out = space.run_expect(&mut depscan_command(vec!["--depfile", "main.d", "main.c"]))?;
    assert_eq!(stdout(&out), "main.c: main.h\nmain.o: main.c main.h gen.h\n");
    Ok(())
}

#[test]
fn bad_depfile() -> anyhow::Result<()> {
    let space = TestSpace::new()?;
    space.write("main.c", "")?;
    space.write("main.d", "main.o main.c\n")?;

    let out = space.run(&mut depscan_command(vec!["--depfile", "main.d", "main.c"]))?;
    assert_eq!(out.status.code(), Some(1));
    assert_output_contains(&out, "parse error: expected ':'");
    assert_output_contains(&out, "main.d:1:");
    Ok(())
}
