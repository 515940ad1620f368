use anyhow::anyhow;
use argh::FromArgs;
use std::path::Path;

use crate::{
    depfile,
    discover::Discovery,
    fs::RealFileSystem,
    graph::{EdgeKind, Graph, NodeId},
    hash,
    registry::ScannerRegistry,
    search_path::SearchPath,
    trace,
    warnings::{IgnoreWarnings, LogWarnings, Warnings},
};

#[derive(FromArgs)]
/// depscan, list the files each target transitively includes
struct Opts {
    /// chdir before running
    #[argh(option, short = 'C')]
    chdir: Option<String>,

    /// directory to search for includes, in order; repeatable
    #[argh(option, short = 'I')]
    include_dir: Vec<String>,

    /// parallelism [default uses system thread count]
    #[argh(option, short = 'j')]
    jobs: Option<usize>,

    /// debugging tools, "-d list" to list
    #[argh(option, short = 'd')]
    debug: Option<String>,

    /// warning controls, "-W list" to list
    #[argh(option, short = 'W')]
    warn: Option<String>,

    /// depfile whose rules are merged into the output; repeatable
    #[argh(option)]
    depfile: Vec<String>,

    /// print a fingerprint of each dependency list
    #[argh(switch, short = 'v')]
    verbose: bool,

    /// files to scan
    #[argh(positional)]
    targets: Vec<String>,
}

enum Debug {
    None,
    Includes,
    Tree,
}

/// The search path from -I, or else from $DEPSCAN_PATH.
fn search_dirs(opts: &Opts) -> Vec<String> {
    if !opts.include_dir.is_empty() {
        return opts.include_dir.clone();
    }
    match std::env::var_os("DEPSCAN_PATH") {
        Some(var) => std::env::split_paths(&var)
            .filter_map(|path| path.to_str().map(str::to_owned))
            .filter(|path| !path.is_empty())
            .collect(),
        None => Vec::new(),
    }
}

fn print_deps(
    graph: &Graph,
    id: NodeId,
    deps: &[NodeId],
    fs: &RealFileSystem,
    verbose: bool,
) -> anyhow::Result<()> {
    let mut line = format!("{}:", graph.name(id));
    for &dep in deps {
        line.push(' ');
        line.push_str(&graph.name(dep));
    }
    println!("{}", line);
    if verbose {
        let hash = hash::fingerprint(graph, fs, deps)
            .map_err(|err| anyhow!("fingerprint {}: {}", graph.name(id), err))?;
        println!("  hash {}", hash);
    }
    Ok(())
}

fn run_impl() -> anyhow::Result<i32> {
    let opts: Opts = argh::from_env();

    let mut debug = Debug::None;
    if let Some(tool) = &opts.debug {
        match tool.as_str() {
            "list" => {
                println!("debug tools:");
                println!("  includes  print the include tree of each target");
                println!("  tree      like includes, expanding each file only once");
                println!("  trace     generate json performance trace");
                return Ok(1);
            }
            "includes" => debug = Debug::Includes,
            "tree" => debug = Debug::Tree,
            "trace" => trace::open("trace.json")?,
            _ => anyhow::bail!("unknown -d {:?}, use -d list to list", tool),
        }
    }

    let mut quiet = false;
    if let Some(warn) = &opts.warn {
        match warn.as_str() {
            "list" => {
                println!("warning flags:");
                println!("  no-dependency  don't warn about includes that matched no file");
                return Ok(1);
            }
            "no-dependency" => quiet = true,
            "dependency" => quiet = false,
            _ => anyhow::bail!("unknown -W {:?}, use -W list to list", warn),
        }
    }

    if let Some(dir) = &opts.chdir {
        let dir = Path::new(dir);
        std::env::set_current_dir(dir).map_err(|err| anyhow!("chdir {:?}: {}", dir, err))?;
    }

    if opts.targets.is_empty() {
        anyhow::bail!("no targets specified");
    }

    let parallelism = match opts.jobs {
        Some(0) => anyhow::bail!("invalid -j 0"),
        Some(n) => n,
        None => usize::from(std::thread::available_parallelism()?),
    };
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(parallelism)
        .build()?;

    let fs = RealFileSystem::new();
    let registry = ScannerRegistry::with_defaults();
    let log_warnings = LogWarnings::default();
    let ignore_warnings = IgnoreWarnings::default();
    let warnings: &dyn Warnings = if quiet {
        &ignore_warnings
    } else {
        &log_warnings
    };
    let discovery = Discovery::new(&registry, &fs, warnings);

    let mut graph = Graph::new();
    let path = graph.search_path(SearchPath::new(search_dirs(&opts)));
    let mut targets: Vec<NodeId> = opts.targets.iter().map(|t| graph.file_id(t)).collect();

    // Targets named by depfiles are reported too, with the deps they list.
    for name in &opts.depfile {
        let rules = trace::scope("depfile::read", || depfile::read(&fs, name))?;
        for rule in &rules {
            for target in &rule.targets {
                let id = graph.file_id(target);
                if !targets.contains(&id) {
                    targets.push(id);
                }
            }
        }
        depfile::add_to_graph(&mut graph, &rules);
    }

    let requests: Vec<_> = targets.iter().map(|&id| (id, path)).collect();
    let failures = pool.install(|| discovery.scan_all(&mut graph, &requests));
    for failure in &failures {
        eprintln!("depscan: scan {} failed: {}", graph.name(failure.node), failure.error);
    }

    for &id in &targets {
        if failures.iter().any(|failure| failure.node == id) {
            continue;
        }
        match debug {
            Debug::Includes => {
                print!("{}", discovery.include_tree(&graph, id, path, false)?);
                continue;
            }
            Debug::Tree => {
                print!("{}", discovery.include_tree(&graph, id, path, true)?);
                continue;
            }
            Debug::None => {}
        }
        let mut deps: Vec<NodeId> = graph
            .dependencies_of_kind(id, EdgeKind::Implicit)
            .collect();
        for dep in graph.dependencies_of_kind(id, EdgeKind::Output) {
            if !deps.contains(&dep) {
                deps.push(dep);
            }
        }
        print_deps(&graph, id, &deps, &fs, opts.verbose)?;
    }

    Ok(if failures.is_empty() { 0 } else { 1 })
}

pub fn run() -> anyhow::Result<i32> {
    let res = run_impl();
    if let Err(err) = trace::close() {
        tracing::warn!("trace: {}", err);
    }
    res
}
