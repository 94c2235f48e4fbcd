//! Typed view of the shared training configuration
//!
//! Every field here is forwarded verbatim to the external tuning and training
//! programs, so names and spelling follow their parser (`--df_size`, not `--df-size`).
use std::fmt;

use clap::Parser;

/// Field that selects the unlearning method in the external programs.
pub const UNLEARNING_MODEL: &str = "unlearning_model";

/// Fields that exist in the configuration but are never forwarded.
const NOT_FORWARDED: &[&str] = &["experiment_name"];

#[derive(Parser, Debug, Clone)]
pub struct ExperimentConfig {
    /// Dataset name, also used as the log subdirectory
    #[arg(long, default_value_t = String::from("Cora"))]
    pub dataset: String,

    /// GNN architecture
    #[arg(long, default_value_t = String::from("gcn"))]
    pub gnn: String,

    /// Poisoning attack type (label, edge, ...)
    #[arg(long = "attack_type", default_value_t = String::from("label"))]
    pub attack_type: String,

    /// Fraction of the poisoned set to forget
    #[arg(long = "df_size", default_value_t = 0.5)]
    pub df_size: f64,

    #[arg(long = "random_seed", default_value_t = 0)]
    pub random_seed: i64,

    /// Fraction of the poisoned set that is known to the unlearning method
    #[arg(long = "corrective_frac", default_value_t = 1.0)]
    pub corrective_frac: f64,

    #[arg(long = "unlearning_model", default_value_t = String::from("retrain"))]
    pub unlearning_model: String,

    #[arg(long = "experiment_name")]
    pub experiment_name: Option<String>,

    /// Unlearning request type (node or edge)
    #[arg(long, default_value_t = String::from("node"))]
    pub request: String,

    #[arg(long = "hidden_dim", default_value_t = 64)]
    pub hidden_dim: i64,

    #[arg(long = "training_epochs", default_value_t = 1208)]
    pub training_epochs: i64,

    #[arg(long = "unlearning_epochs", default_value_t = 50)]
    pub unlearning_epochs: i64,

    #[arg(long = "train_lr", default_value_t = 0.025)]
    pub train_lr: f64,

    #[arg(long = "weight_decay", default_value_t = 0.0005)]
    pub weight_decay: f64,

    /// Number of hyperparameter tuning trials
    #[arg(long, default_value_t = 100)]
    pub trials: i64,

    #[arg(long = "ascent_lr")]
    pub ascent_lr: Option<f64>,

    #[arg(long = "descent_lr")]
    pub descent_lr: Option<f64>,

    /// Poison linked nodes instead of random ones
    #[arg(long, action)]
    pub linked: bool,

    /// Use embeddings of all nodes during unlearning
    #[arg(long = "embs_all", action)]
    pub embs_all: bool,
}

/// A single configuration value, typed the way the external parser types it.
#[derive(Debug, Clone, PartialEq)]
pub enum ArgValue {
    Text(String),
    Int(i64),
    Float(f64),
    Flag(bool),
}

impl fmt::Display for ArgValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgValue::Text(s) => f.write_str(s),
            ArgValue::Int(i) => write!(f, "{}", i),
            ArgValue::Float(v) => f.write_str(&py_float(*v)),
            ArgValue::Flag(true) => f.write_str("True"),
            ArgValue::Flag(false) => f.write_str("False"),
        }
    }
}

impl ExperimentConfig {
    /// All fields in declaration order; `None` marks an unset optional field.
    pub fn fields(&self) -> Vec<(&'static str, Option<ArgValue>)> {
        let text = |s: &String| Some(ArgValue::Text(s.clone()));
        vec![
            ("dataset", text(&self.dataset)),
            ("gnn", text(&self.gnn)),
            ("attack_type", text(&self.attack_type)),
            ("df_size", Some(ArgValue::Float(self.df_size))),
            ("random_seed", Some(ArgValue::Int(self.random_seed))),
            ("corrective_frac", Some(ArgValue::Float(self.corrective_frac))),
            (UNLEARNING_MODEL, text(&self.unlearning_model)),
            ("experiment_name", self.experiment_name.as_ref().and_then(text)),
            ("request", text(&self.request)),
            ("hidden_dim", Some(ArgValue::Int(self.hidden_dim))),
            ("training_epochs", Some(ArgValue::Int(self.training_epochs))),
            ("unlearning_epochs", Some(ArgValue::Int(self.unlearning_epochs))),
            ("train_lr", Some(ArgValue::Float(self.train_lr))),
            ("weight_decay", Some(ArgValue::Float(self.weight_decay))),
            ("trials", Some(ArgValue::Int(self.trials))),
            ("ascent_lr", self.ascent_lr.map(ArgValue::Float)),
            ("descent_lr", self.descent_lr.map(ArgValue::Float)),
            ("linked", Some(ArgValue::Flag(self.linked))),
            ("embs_all", Some(ArgValue::Flag(self.embs_all))),
        ]
    }

    /// Translate the configuration into `--flag value` tokens for a subprocess.
    ///
    /// `unlearning_model` replaces the configured method when given. Boolean
    /// fields become a bare `--flag` when set and disappear otherwise.
    pub fn to_cli_args(&self, unlearning_model: Option<&str>) -> Vec<String> {
        let mut tokens = Vec::new();
        for (key, value) in self.fields() {
            match (unlearning_model, value) {
                (Some(model), _) if key == UNLEARNING_MODEL => {
                    tokens.push(format!("--{}", key));
                    tokens.push(model.to_owned());
                }
                _ if NOT_FORWARDED.contains(&key) => {}
                (_, None) => {}
                (_, Some(ArgValue::Flag(set))) => {
                    if set {
                        tokens.push(format!("--{}", key));
                    }
                }
                (_, Some(value)) => {
                    tokens.push(format!("--{}", key));
                    tokens.push(value.to_string());
                }
            }
        }
        tokens
    }
}

/// Format a float the way Python's `str()` does.
///
/// The external programs embed these strings in log filenames, so `1.0` must
/// stay `1.0` and `1e-5` must become `1e-05`.
pub fn py_float(v: f64) -> String {
    if v.is_nan() {
        return "nan".to_owned();
    }
    if v.is_infinite() {
        return if v > 0.0 { "inf" } else { "-inf" }.to_owned();
    }

    let magnitude = v.abs();
    if magnitude != 0.0 && !(1e-4..1e16).contains(&magnitude) {
        // rust prints `1e-5`, python wants a signed two digit exponent
        let repr = format!("{:e}", v);
        return match repr.split_once('e') {
            Some((mantissa, exp)) => {
                let (sign, digits) = match exp.strip_prefix('-') {
                    Some(d) => ('-', d),
                    None => ('+', exp),
                };
                format!("{}e{}{:0>2}", mantissa, sign, digits)
            }
            None => repr,
        };
    }

    if v.fract() == 0.0 {
        format!("{:.1}", v)
    } else {
        format!("{}", v)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn config(args: &[&str]) -> ExperimentConfig {
        ExperimentConfig::parse_from(std::iter::once("cognac-best").chain(args.iter().copied()))
    }

    fn flag_value<'a>(tokens: &'a [String], flag: &str) -> Option<&'a str> {
        let pos = tokens.iter().position(|t| t == flag)?;
        tokens.get(pos + 1).map(String::as_str)
    }

    #[test]
    fn test_true_bool_is_bare_flag() {
        let tokens = config(&["--linked"]).to_cli_args(None);
        let pos = tokens.iter().position(|t| t == "--linked").unwrap();
        // the next token must be another flag, never a value
        assert!(tokens.get(pos + 1).map_or(true, |t| t.starts_with("--")));
        assert!(!tokens.iter().any(|t| t == "True"));
    }

    #[test]
    fn test_false_bool_is_absent() {
        let tokens = config(&[]).to_cli_args(None);
        assert!(!tokens.iter().any(|t| t == "--linked"));
        assert!(!tokens.iter().any(|t| t == "--embs_all"));
    }

    #[test]
    fn test_variant_override() {
        let cfg = config(&["--unlearning_model", "gif"]);
        let tokens = cfg.to_cli_args(Some("cognac-descent"));
        assert_eq!(flag_value(&tokens, "--unlearning_model"), Some("cognac-descent"));
        assert!(!tokens.iter().any(|t| t == "gif"));

        let tokens = cfg.to_cli_args(None);
        assert_eq!(flag_value(&tokens, "--unlearning_model"), Some("gif"));
    }

    #[test]
    fn test_skips_unset_and_excluded_fields() {
        let cfg = config(&["--experiment_name", "sweep", "--descent_lr", "0.01"]);
        let tokens = cfg.to_cli_args(Some("cognac"));
        assert!(!tokens.iter().any(|t| t == "--experiment_name" || t == "sweep"));
        assert!(!tokens.iter().any(|t| t == "--ascent_lr"));
        assert_eq!(flag_value(&tokens, "--descent_lr"), Some("0.01"));
    }

    #[test]
    fn test_tokens_follow_declaration_order() {
        let tokens = config(&["--dataset", "PubMed", "--df_size", "0.3"]).to_cli_args(None);
        assert_eq!(
            &tokens[..8],
            &["--dataset", "PubMed", "--gnn", "gcn", "--attack_type", "label", "--df_size", "0.3"]
        );
        assert_eq!(flag_value(&tokens, "--corrective_frac"), Some("1.0"));
        assert_eq!(flag_value(&tokens, "--weight_decay"), Some("0.0005"));
    }

    #[test]
    fn test_py_float() {
        assert_eq!(py_float(0.3), "0.3");
        assert_eq!(py_float(1.0), "1.0");
        assert_eq!(py_float(0.0), "0.0");
        assert_eq!(py_float(-2.0), "-2.0");
        assert_eq!(py_float(0.025), "0.025");
        assert_eq!(py_float(1e-5), "1e-05");
        assert_eq!(py_float(2.5e-7), "2.5e-07");
        assert_eq!(py_float(1e16), "1e+16");
        assert_eq!(py_float(f64::INFINITY), "inf");
    }
}
