/// Phrase Linter: validates phrase bank coverage and vocabulary.
///
/// Usage: phrase_linter <phrases_path> [--synonyms <file>] [--min <n>]

use match_report::core::assembler::{section_fields, section_roles};
use match_report::core::facts::FactContext;
use match_report::core::grammar::TemplateSegment;
use match_report::core::phrase_bank::PhraseBank;
use match_report::core::variety::SynonymRegistry;
use match_report::schema::phrase::PhraseCategory;
use std::path::Path;
use std::process;

const CATEGORIES: [PhraseCategory; 7] = [
    PhraseCategory::Title,
    PhraseCategory::PriorMeeting,
    PhraseCategory::FirstGoal,
    PhraseCategory::RegularGoal,
    PhraseCategory::GoalGroup,
    PhraseCategory::LastGoal,
    PhraseCategory::Conclusion,
];

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
        println!("Usage: phrase_linter <phrases_path> [--synonyms <file>] [--min <n>]");
        process::exit(0);
    }

    let phrases_path = &args[1];
    let mut synonyms_path = None;
    let mut min_alternatives: usize = 2;

    let mut i = 2;
    while i < args.len() {
        match args[i].as_str() {
            "--synonyms" if i + 1 < args.len() => {
                i += 1;
                synonyms_path = Some(args[i].clone());
            }
            "--min" if i + 1 < args.len() => {
                i += 1;
                min_alternatives = args[i].parse().unwrap_or(2);
            }
            _ => {}
        }
        i += 1;
    }

    let mut bank = PhraseBank::new();
    let path = Path::new(phrases_path);
    if path.is_file() {
        match PhraseBank::load_from_ron(path) {
            Ok(loaded) => bank = loaded,
            Err(e) => {
                eprintln!("ERROR: Failed to load phrase file: {}", e);
                process::exit(1);
            }
        }
    } else if path.is_dir() {
        load_phrases_from_dir(path, &mut bank);
    } else {
        eprintln!("ERROR: Path '{}' does not exist", phrases_path);
        process::exit(1);
    }

    println!("Loaded {} phrase templates", bank.len());

    let synonyms = synonyms_path.as_deref().map(|p| {
        SynonymRegistry::load_from_ron(Path::new(p)).unwrap_or_else(|e| {
            eprintln!("ERROR: Failed to load synonyms: {}", e);
            process::exit(1);
        })
    });

    let (errors, warnings) = lint_phrases(&bank, synonyms.as_ref(), min_alternatives);

    println!("\n=== Phrase Lint Report ===\n");

    if errors.is_empty() && warnings.is_empty() {
        println!("All checks passed!");
    }

    for warning in &warnings {
        println!("WARNING: {}", warning);
    }

    for error in &errors {
        println!("ERROR: {}", error);
    }

    println!(
        "\nSummary: {} errors, {} warnings",
        errors.len(),
        warnings.len()
    );

    if errors.is_empty() {
        process::exit(0);
    } else {
        process::exit(1);
    }
}

fn load_phrases_from_dir(dir: &Path, bank: &mut PhraseBank) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    let mut paths: Vec<_> = entries
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| path.extension().and_then(|s| s.to_str()) == Some("ron"))
        .collect();
    paths.sort();
    for path in paths {
        match PhraseBank::load_from_ron(&path).map(|loaded| bank.merge(loaded)) {
            Ok(Ok(())) => println!("  Loaded: {}", path.display()),
            Ok(Err(e)) | Err(e) => eprintln!("  ERROR loading {}: {}", path.display(), e),
        }
    }
}

fn lint_phrases(
    bank: &PhraseBank,
    synonyms: Option<&SynonymRegistry>,
    min_alternatives: usize,
) -> (Vec<String>, Vec<String>) {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    for category in CATEGORIES {
        let count = bank.templates(category).count();
        if count == 0 {
            errors.push(format!("Category '{}' has no templates", category.name()));
        } else if count < min_alternatives {
            warnings.push(format!(
                "Category '{}' has only {} template(s), minimum is {}",
                category.name(),
                count,
                min_alternatives
            ));
        }
    }

    for template in bank.all() {
        let roles = section_roles(template.category);
        let fields = section_fields(template.category);
        for role in template.template.roles() {
            if !roles.iter().any(|r| *r == role) {
                errors.push(format!(
                    "Template {} ({}) uses role '{}' not bound in that section",
                    template.id,
                    template.category.name(),
                    role
                ));
            }
        }
        for field in template.template.fields() {
            if !fields.iter().any(|f| *f == field) {
                errors.push(format!(
                    "Template {} ({}) uses unknown field '{}'",
                    template.id,
                    template.category.name(),
                    field
                ));
            }
        }

        if let Some(registry) = synonyms {
            for segment in &template.template.segments {
                if let TemplateSegment::Synonym(word) = segment {
                    if registry.candidates(word).is_none() {
                        warnings.push(format!(
                            "Template {} rotates '{}', which has no synonyms",
                            template.id, word
                        ));
                    }
                }
            }
        }

        if template.category == PhraseCategory::Title {
            let p = &template.predicates;
            let plain = p.with_champion.is_none()
                && p.win_streak != Some(true)
                && p.lose_streak != Some(true);
            if plain && p.score_diff.is_unbounded() && p.total_goals.is_unbounded() {
                errors.push(format!(
                    "Title template {} bounds neither score_diff nor total_goals and is never drawn",
                    template.id
                ));
            }
        }
    }

    for diff in 0..=5i64 {
        for total in (diff..=diff + 4).step_by(2) {
            let facts = FactContext {
                score_diff: diff,
                total_goals: total,
                ..FactContext::default()
            };
            let eligible = bank.select_eligible(PhraseCategory::Title, &facts, &[]);
            if eligible.len() < 2 {
                warnings.push(format!(
                    "Score difference {} with {} goals has {} title template(s); title and lead need two",
                    diff,
                    total,
                    eligible.len()
                ));
            }
        }
    }

    (errors, warnings)
}
