/// Report Preview: interactive shell for trying phrase data against a league.
///
/// Usage: report_preview --league <file> --phrases <path> [--lexicon <file>]
///        [--synonyms <file>] [--seed <n>] [--match <id>]
///
/// Commands:
///   report <id>      generate and persist the report of a match
///   debug <id>       generate with template ids, persisting nothing
///   regen <id>       regenerate from fresh state
///   table <id>       print the standings as of a match
///   bulk <id> <n>    n debug reports with title variety stats
///   seed <n>         rebuild the engine with a new seed
///   help             list commands
///   quit             exit

use match_report::core::pipeline::{Report, ReportEngine, ReportOptions};
use match_report::core::standings::StandingsEngine;
use match_report::core::store::{LeagueStore, MemoryStore};
use match_report::schema::league::MatchId;
use rustc_hash::FxHashSet;
use std::io::{self, BufRead, Write};
use std::path::Path;

struct Paths {
    phrases: Vec<String>,
    lexicon: Option<String>,
    synonyms: Option<String>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 || args[1] == "--help" || args[1] == "-h" {
        print_usage();
        return;
    }

    let mut league_path = None;
    let mut paths = Paths {
        phrases: Vec::new(),
        lexicon: None,
        synonyms: None,
    };
    let mut seed: u64 = 42;
    let mut one_shot = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--league" if i + 1 < args.len() => {
                i += 1;
                league_path = Some(args[i].clone());
            }
            "--phrases" if i + 1 < args.len() => {
                i += 1;
                paths.phrases.push(args[i].clone());
            }
            "--lexicon" if i + 1 < args.len() => {
                i += 1;
                paths.lexicon = Some(args[i].clone());
            }
            "--synonyms" if i + 1 < args.len() => {
                i += 1;
                paths.synonyms = Some(args[i].clone());
            }
            "--seed" if i + 1 < args.len() => {
                i += 1;
                seed = args[i].parse().unwrap_or(42);
            }
            "--match" if i + 1 < args.len() => {
                i += 1;
                one_shot = args[i].parse::<u64>().ok().map(MatchId);
            }
            _ => {
                eprintln!("Unknown argument: {}", args[i]);
                print_usage();
                std::process::exit(1);
            }
        }
        i += 1;
    }

    let Some(league_path) = league_path else {
        eprintln!("ERROR: --league is required");
        std::process::exit(1);
    };
    let mut store = match MemoryStore::load_from_ron(Path::new(&league_path)) {
        Ok(store) => store,
        Err(e) => {
            eprintln!("ERROR: Failed to load league: {}", e);
            std::process::exit(1);
        }
    };

    let mut engine = build_engine(&paths, seed);

    if let Some(id) = one_shot {
        match engine.generate_report(&mut store, id, ReportOptions::default()) {
            Ok(report) => print_report(&report),
            Err(e) => {
                eprintln!("ERROR: {}", e);
                std::process::exit(1);
            }
        }
        return;
    }

    println!("Loaded {} matches, {} phrase templates", store.match_ids().count(), engine.phrase_bank().len());
    println!("Seed: {}", seed);
    println!("Type 'help' for commands.\n");

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("preview> ");
        stdout.flush().ok();

        let mut line = String::new();
        if stdin.lock().read_line(&mut line).is_err() || line.is_empty() {
            break;
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let parts: Vec<&str> = line.split_whitespace().collect();
        let cmd = parts[0].to_lowercase();
        let id = parts.get(1).and_then(|s| s.parse::<u64>().ok()).map(MatchId);

        match (cmd.as_str(), id) {
            ("quit" | "exit" | "q", _) => {
                println!("Goodbye.");
                break;
            }
            ("help" | "h" | "?", _) => print_help(),
            ("report", Some(id)) => generate(&mut engine, &mut store, id, ReportOptions::default()),
            ("debug", Some(id)) => {
                let options = ReportOptions {
                    debug: true,
                    regenerate: false,
                };
                generate(&mut engine, &mut store, id, options);
            }
            ("regen", Some(id)) => {
                let options = ReportOptions {
                    debug: false,
                    regenerate: true,
                };
                generate(&mut engine, &mut store, id, options);
            }
            ("table", Some(id)) => print_table(&store, id),
            ("bulk", Some(id)) => {
                let n: usize = parts.get(2).and_then(|s| s.parse().ok()).unwrap_or(10);
                bulk(&mut engine, &mut store, id, n);
            }
            ("seed", _) => match parts.get(1).and_then(|s| s.parse::<u64>().ok()) {
                Some(new_seed) => {
                    engine = build_engine(&paths, new_seed);
                    println!("Seed set to {}", new_seed);
                }
                None => println!("Usage: seed <n>"),
            },
            ("report" | "debug" | "regen" | "table" | "bulk", None) => {
                println!("Usage: {} <match_id>", cmd);
            }
            _ => println!("Unknown command '{}'. Type 'help' for commands.", cmd),
        }
    }
}

fn build_engine(paths: &Paths, seed: u64) -> ReportEngine {
    let mut builder = ReportEngine::builder().seed(seed);
    for path in &paths.phrases {
        builder = builder.phrase_bank_path(path);
    }
    if let Some(path) = &paths.lexicon {
        builder = builder.lexicon_path(path);
    }
    if let Some(path) = &paths.synonyms {
        builder = builder.synonyms_path(path);
    }
    match builder.build() {
        Ok(engine) => engine,
        Err(e) => {
            eprintln!("ERROR: Failed to build engine: {}", e);
            std::process::exit(1);
        }
    }
}

fn generate(engine: &mut ReportEngine, store: &mut MemoryStore, id: MatchId, options: ReportOptions) {
    match engine.generate_report(store, id, options) {
        Ok(report) => print_report(&report),
        Err(e) => println!("ERROR: {}", e),
    }
}

fn print_report(report: &Report) {
    println!("\n--- Match {} ---", report.match_id.0);
    println!("{}\n", report.title);
    println!("{}", report.body());
    println!("--- End ---\n");
}

fn print_table(store: &MemoryStore, id: MatchId) {
    let mut standings = StandingsEngine::new();
    let table = match standings.compute_standings(store, id) {
        Ok(table) => table,
        Err(e) => {
            println!("ERROR: {}", e);
            return;
        }
    };
    println!("\n  #  {:<20} {:>3} {:>3} {:>3} {:>3} {:>7} {:>4}", "Team", "P", "W", "D", "L", "Goals", "Pts");
    for (i, row) in table.rows.iter().enumerate() {
        let name = store
            .load_team(row.team)
            .map(|team| team.name)
            .unwrap_or_else(|_| format!("#{}", row.team.0));
        println!(
            "{:>3}  {:<20} {:>3} {:>3} {:>3} {:>3} {:>3}:{:<3} {:>4}",
            i + 1,
            name,
            row.played,
            row.wins,
            row.draws,
            row.losses,
            row.goals_for,
            row.goals_against,
            row.points
        );
    }
    println!();
}

fn bulk(engine: &mut ReportEngine, store: &mut MemoryStore, id: MatchId, n: usize) {
    let options = ReportOptions {
        debug: true,
        regenerate: false,
    };
    let mut titles = FxHashSet::default();
    let mut templates = FxHashSet::default();
    let mut failures = 0;
    for _ in 0..n {
        match engine.generate_report(store, id, options) {
            Ok(report) => {
                titles.insert(report.title.clone());
                templates.extend(report.templates());
            }
            Err(_) => failures += 1,
        }
    }
    println!("\n--- Variety over {} reports ---", n);
    println!("  Distinct titles: {}", titles.len());
    println!("  Distinct templates: {}", templates.len());
    println!("  Failures: {}", failures);
    println!();
}

fn print_usage() {
    println!("Usage: report_preview --league <file> --phrases <path> [--lexicon <file>]");
    println!("       [--synonyms <file>] [--seed <n>] [--match <id>]");
    println!();
    println!("  --phrases may be given more than once; a directory loads every .ron file in it.");
    println!("  --match prints one report and exits.");
}

fn print_help() {
    println!("Commands:");
    println!("  report <id>      generate and persist the report of a match");
    println!("  debug <id>       generate with template ids, persisting nothing");
    println!("  regen <id>       regenerate from fresh state");
    println!("  table <id>       print the standings as of a match");
    println!("  bulk <id> <n>    n debug reports with title variety stats");
    println!("  seed <n>         rebuild the engine with a new seed");
    println!("  help             list commands");
    println!("  quit             exit");
}
