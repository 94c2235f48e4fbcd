//! Runs both Cognac variants and recommends the one that forgets better
//!
//! For every variant: tune hyperparameters, run the main experiment, then read
//! its metrics back from the run log. Failures skip the rest of that variant
//! only. With `--only-compare` nothing is run and existing logs are compared.
use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    thread::sleep,
    time::Duration,
};

use clap::Parser;

use super::{
    compare::compare_results,
    results::{parse_results_from_logs, LogLocation, LogQuery, VariantResult},
    variant::Variant,
};
use crate::{
    config::ExperimentConfig,
    utils::{external_prog::run_command, results_uploader::ResultHandler},
};

#[derive(Parser, Debug, Clone)]
pub struct ControlArgs {
    /// Skip hyperparameter tuning
    #[arg(long, action)]
    pub skip_hp_tune: bool,

    /// Only compare existing results, run nothing
    #[arg(long, action)]
    pub only_compare: bool,

    /// Interpreter used to start the tuning and training scripts
    #[arg(long, default_value_t = String::from("python"))]
    pub python: String,

    #[arg(long, default_value = "hp_tune.py")]
    pub hp_tune_script: PathBuf,

    #[arg(long, default_value = "main.py")]
    pub main_script: PathBuf,

    /// Directory holding one subdirectory of run logs per dataset
    #[arg(long, default_value = "logs/default")]
    pub log_root: PathBuf,

    /// Dataset to poisoned classes mapping
    #[arg(long, default_value = "classes_to_poison.json")]
    pub classes_file: PathBuf,

    /// How long to wait for the run log to be flushed after an experiment
    #[arg(long, default_value_t = 1000)]
    pub flush_delay_ms: u64,

    /// Upload the winning run log to this URL
    #[arg(long)]
    pub push_results_url: Option<String>,
}

impl ControlArgs {
    fn log_location(&self) -> LogLocation {
        LogLocation {
            log_root: self.log_root.clone(),
            classes_file: self.classes_file.clone(),
        }
    }

    fn script_args(&self, script: &Path, config: &ExperimentConfig, variant: Variant) -> Vec<String> {
        let mut args = vec![script.display().to_string()];
        args.extend(config.to_cli_args(Some(variant.as_str())));
        args
    }
}

/// Tune, run and parse one variant. `None` if any step failed.
fn process_variant(
    config: &ExperimentConfig,
    control: &ControlArgs,
    variant: Variant,
) -> Option<VariantResult> {
    info!("{}", "#".repeat(60));
    info!("PROCESSING VARIANT: {}", variant.as_str().to_uppercase());
    info!("{}", "#".repeat(60));

    if !control.skip_hp_tune {
        let args = control.script_args(&control.hp_tune_script, config, variant);
        let description = format!("Hyperparameter tuning for {}", variant);
        if !run_command(&control.python, &args, &description) {
            error!("Hyperparameter tuning failed for {}, skipping...", variant);
            return None;
        }
    }

    let args = control.script_args(&control.main_script, config, variant);
    let description = format!("Main experiment for {}", variant);
    if !run_command(&control.python, &args, &description) {
        error!("Main experiment failed for {}, skipping...", variant);
        return None;
    }

    // the logger may still be writing
    sleep(Duration::from_millis(control.flush_delay_ms));

    let result =
        parse_results_from_logs(&control.log_location(), &LogQuery::from_config(config), variant);
    match &result {
        Some(_) => info!("Results captured for {}", variant),
        None => warn!("Could not parse results for {}", variant),
    }
    result
}

fn collect_results(config: &ExperimentConfig, control: &ControlArgs) -> HashMap<Variant, VariantResult> {
    let mut results = HashMap::new();

    if control.only_compare {
        let location = control.log_location();
        let query = LogQuery::from_config(config);
        for variant in Variant::ALL {
            if let Some(result) = parse_results_from_logs(&location, &query, variant) {
                results.insert(variant, result);
            }
        }
        return results;
    }

    info!("Starting Cognac best runner");
    info!(
        "Dataset: {}, GNN: {}, Attack: {}",
        config.dataset, config.gnn, config.attack_type
    );
    info!(
        "Forgetting fraction: {}, Seed: {}",
        config.df_size, config.random_seed
    );

    for variant in Variant::ALL {
        if let Some(result) = process_variant(config, control, variant) {
            results.insert(variant, result);
        }
    }
    results
}

fn print_recommendation(best: &VariantResult) {
    println!("\n{}", "=".repeat(60));
    println!("FINAL RECOMMENDATION");
    println!("{}", "=".repeat(60));
    println!(
        "For your configuration, use: --unlearning_model {}",
        best.variant
    );
    println!("Forget Accuracy: {:.4} (higher is better)", best.forget_acc);
    println!("Utility Accuracy: {:.4} (higher is better)", best.utility_acc);
    println!("Time Taken: {:.2}s", best.time_taken);
    println!("Full results available in: {}", best.log_file.display());
}

/// Run the whole comparison. Returns the winner, or `None` if neither variant
/// produced a result.
pub fn run(
    config: &ExperimentConfig,
    control: &ControlArgs,
    handler: &dyn ResultHandler,
) -> Option<VariantResult> {
    let results = collect_results(config, control);

    let best = compare_results(
        results.get(&Variant::Cognac),
        results.get(&Variant::CognacDescent),
    )
    .cloned();

    match &best {
        Some(best) => {
            print_recommendation(best);
            if let Err(e) = handler.handle_result(&best.log_file) {
                warn!("failed to handle result file: {}", e);
            }
        }
        None => {
            println!("\nCould not determine the best variant. Please check the logs manually.");
            println!(
                "Log directory: {}/",
                control.log_location().dataset_dir(&config.dataset).display()
            );
        }
    }

    best
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::utils::results_uploader::ResultIgnorer;
    use std::{cell::RefCell, fs};
    use tempfile::TempDir;

    const LOG_NAME: &str = "run_logs_label_0.3_A_B.json";
    const BOTH_VARIANTS: &str = r#"{"results": {"0": {
        "cognac": {"forget": 0.82, "utility": 0.79, "forget_f1": 0.8, "utility_f1": 0.78, "time_taken": 41.0},
        "cognac-descent": {"forget": 0.74, "utility": 0.81, "forget_f1": 0.7, "utility_f1": 0.8, "time_taken": 12.0}
    }}}"#;

    struct Recorder(RefCell<Vec<PathBuf>>);

    impl ResultHandler for Recorder {
        fn handle_result(&self, path: &Path) -> anyhow::Result<()> {
            self.0.borrow_mut().push(path.to_owned());
            Ok(())
        }
    }

    fn setup() -> (TempDir, ExperimentConfig, ControlArgs) {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("classes_to_poison.json"),
            r#"{"Cora": {"class1": "A", "class2": "B"}}"#,
        )
        .unwrap();

        let config = ExperimentConfig::parse_from([
            "cognac-best",
            "--dataset",
            "Cora",
            "--df_size",
            "0.3",
        ]);
        let control = ControlArgs::parse_from([
            "cognac-best",
            "--python",
            "sh",
            "--flush-delay-ms",
            "0",
            "--log-root",
            dir.path().join("logs/default").to_str().unwrap(),
            "--classes-file",
            dir.path().join("classes_to_poison.json").to_str().unwrap(),
            "--hp-tune-script",
            dir.path().join("hp_tune.sh").to_str().unwrap(),
            "--main-script",
            dir.path().join("main.sh").to_str().unwrap(),
        ]);
        (dir, config, control)
    }

    fn log_dir(dir: &TempDir) -> PathBuf {
        dir.path().join("logs/default/Cora")
    }

    /// Training stand-in that writes the run log and records its arguments.
    fn write_main_script(dir: &TempDir, extra: &str) {
        let script = format!(
            "{extra}\nmkdir -p '{logs}'\necho \"$@\" >> '{calls}'\ncat > '{logs}/{name}' <<'JSON'\n{content}\nJSON\n",
            extra = extra,
            logs = log_dir(dir).display(),
            calls = dir.path().join("main_calls.txt").display(),
            name = LOG_NAME,
            content = BOTH_VARIANTS,
        );
        fs::write(dir.path().join("main.sh"), script).unwrap();
    }

    #[test]
    fn test_only_compare_without_logs_fails() {
        let (_dir, config, mut control) = setup();
        control.only_compare = true;
        assert!(run(&config, &control, &ResultIgnorer::new()).is_none());
    }

    #[test]
    fn test_only_compare_picks_cognac() {
        let (dir, config, mut control) = setup();
        control.only_compare = true;
        fs::create_dir_all(log_dir(&dir)).unwrap();
        fs::write(log_dir(&dir).join(LOG_NAME), BOTH_VARIANTS).unwrap();

        let recorder = Recorder(RefCell::new(vec![]));
        let best = run(&config, &control, &recorder).unwrap();
        assert_eq!(best.variant, Variant::Cognac);
        assert_eq!(best.forget_acc, 0.82);
        assert_eq!(recorder.0.into_inner(), vec![log_dir(&dir).join(LOG_NAME)]);
    }

    #[test]
    fn test_full_pipeline() {
        let (dir, config, control) = setup();
        fs::write(dir.path().join("hp_tune.sh"), "exit 0\n").unwrap();
        write_main_script(&dir, "");

        let best = run(&config, &control, &ResultIgnorer::new()).unwrap();
        assert_eq!(best.variant, Variant::Cognac);

        let calls = fs::read_to_string(dir.path().join("main_calls.txt")).unwrap();
        let calls: Vec<&str> = calls.lines().collect();
        assert_eq!(calls.len(), 2);
        assert!(calls[0].contains("--unlearning_model cognac "));
        assert!(calls[1].contains("--unlearning_model cognac-descent "));
        assert!(calls[0].contains("--df_size 0.3"));
    }

    #[test]
    fn test_failed_tuning_skips_variant() {
        let (dir, config, control) = setup();
        fs::write(dir.path().join("hp_tune.sh"), "echo tuning broke >&2\nexit 1\n").unwrap();
        write_main_script(&dir, "");

        assert!(run(&config, &control, &ResultIgnorer::new()).is_none());
        assert!(!dir.path().join("main_calls.txt").exists());
    }

    #[test]
    fn test_skip_hp_tune_and_one_failing_variant() {
        let (dir, config, mut control) = setup();
        control.skip_hp_tune = true;
        // no tuning script exists, so running it would fail
        write_main_script(&dir, "case \"$*\" in *cognac-descent*) exit 2;; esac");

        let best = run(&config, &control, &ResultIgnorer::new()).unwrap();
        assert_eq!(best.variant, Variant::Cognac);

        let calls = fs::read_to_string(dir.path().join("main_calls.txt")).unwrap();
        assert_eq!(calls.lines().count(), 1);
    }

    #[test]
    fn test_descent_wins_when_cognac_fails() {
        let (dir, config, mut control) = setup();
        control.skip_hp_tune = true;
        write_main_script(&dir, "case \"$*\" in *'unlearning_model cognac '*) exit 2;; esac");

        let best = run(&config, &control, &ResultIgnorer::new()).unwrap();
        assert_eq!(best.variant, Variant::CognacDescent);
        assert_eq!(best.forget_acc, 0.74);
    }
}
