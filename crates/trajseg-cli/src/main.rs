// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use serde::Serialize;
use serde_json::Value;
use std::env;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::process;
use trajseg_cli::{
    EvalReport, ExportTask, PipelineConfig, PostprocessOutcome, Prediction, evaluate_batch,
    export_lines, parse_pipeline_config, postprocess_batch, render_submission,
};
use trajseg_core::SegError;
use trajseg_eval::DEFAULT_CHANGE_POINT_THRESHOLD;

struct Cli {
    command: Command,
}

enum Command {
    Postprocess(PostprocessArgs),
    Export(ExportArgs),
    Eval(EvalArgs),
}

#[derive(Debug, Default)]
struct PipelineOverrides {
    config: Option<PathBuf>,
    k: Option<usize>,
    seed: Option<u64>,
}

#[derive(Debug, Default)]
struct PostprocessArgs {
    input: PathBuf,
    overrides: PipelineOverrides,
    output: Option<PathBuf>,
}

#[derive(Debug)]
struct ExportArgs {
    input: PathBuf,
    task: ExportTask,
    dim: Option<usize>,
    missing_change_point: Option<usize>,
    overrides: PipelineOverrides,
    output: Option<PathBuf>,
}

impl Default for ExportArgs {
    fn default() -> Self {
        Self {
            input: PathBuf::new(),
            task: ExportTask::Models,
            dim: None,
            missing_change_point: None,
            overrides: PipelineOverrides::default(),
            output: None,
        }
    }
}

#[derive(Debug)]
struct EvalArgs {
    predictions: PathBuf,
    ground_truth: PathBuf,
    threshold: usize,
    output: Option<PathBuf>,
}

impl Default for EvalArgs {
    fn default() -> Self {
        Self {
            predictions: PathBuf::new(),
            ground_truth: PathBuf::new(),
            threshold: DEFAULT_CHANGE_POINT_THRESHOLD,
            output: None,
        }
    }
}

#[derive(Debug)]
enum CliError {
    Seg(SegError),
    Io {
        context: String,
        source: std::io::Error,
    },
    Json {
        context: String,
        source: serde_json::Error,
    },
    InvalidInput(String),
}

impl CliError {
    fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    fn json(context: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Json {
            context: context.into(),
            source,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            Self::Seg(err) => err.code(),
            Self::InvalidInput(_) => "invalid_input",
            Self::Io { .. } => "io_error",
            Self::Json { .. } => "json_error",
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Seg(err) => write!(f, "{err}"),
            Self::Io { context, source } => write!(f, "{context}: {source}"),
            Self::Json { context, source } => write!(f, "{context}: {source}"),
            Self::InvalidInput(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Seg(err) => Some(err),
            Self::Io { source, .. } => Some(source),
            Self::Json { source, .. } => Some(source),
            Self::InvalidInput(_) => None,
        }
    }
}

impl From<SegError> for CliError {
    fn from(value: SegError) -> Self {
        Self::Seg(value)
    }
}

#[derive(Serialize)]
struct PostprocessOutput {
    command: &'static str,
    config: PipelineConfig,
    change_points: Vec<Vec<usize>>,
    outcomes: Vec<PostprocessOutcome>,
}

#[derive(Serialize)]
struct EvalOutput {
    command: &'static str,
    #[serde(flatten)]
    report: EvalReport,
}

#[derive(Serialize)]
struct ErrorEnvelope {
    error: ErrorPayload,
}

#[derive(Serialize)]
struct ErrorPayload {
    code: String,
    message: String,
}

fn main() {
    if let Err(err) = run() {
        emit_structured_error(&err);
        process::exit(1);
    }
}

fn run() -> Result<(), CliError> {
    let args = env::args().skip(1).collect::<Vec<_>>();
    let Some(cli) = parse_cli(&args)? else {
        return Ok(());
    };

    match cli.command {
        Command::Postprocess(args) => handle_postprocess(args),
        Command::Export(args) => handle_export(args),
        Command::Eval(args) => handle_eval(args),
    }
}

fn parse_cli(args: &[String]) -> Result<Option<Cli>, CliError> {
    let Some(command_name) = args.first() else {
        print_root_help();
        return Ok(None);
    };

    if matches!(command_name.as_str(), "-h" | "--help") {
        print_root_help();
        return Ok(None);
    }
    if matches!(command_name.as_str(), "-V" | "--version") {
        print_version();
        return Ok(None);
    }

    let rest = &args[1..];
    if rest
        .iter()
        .any(|arg| matches!(arg.as_str(), "-h" | "--help"))
    {
        print_command_help(command_name.as_str())?;
        return Ok(None);
    }
    if rest
        .iter()
        .any(|arg| matches!(arg.as_str(), "-V" | "--version"))
    {
        print_version();
        return Ok(None);
    }

    let command = match command_name.as_str() {
        "postprocess" => Command::Postprocess(parse_postprocess_args(rest)?),
        "export" => Command::Export(parse_export_args(rest)?),
        "eval" => Command::Eval(parse_eval_args(rest)?),
        other => {
            return Err(CliError::invalid_input(format!(
                "unknown command '{other}'; expected one of: postprocess, export, eval"
            )));
        }
    };

    Ok(Some(Cli { command }))
}

/// Consumes a flag shared by the pipeline commands; `Ok(false)` if `flag` is
/// not one of them.
fn parse_override_flag(
    overrides: &mut PipelineOverrides,
    flag: &str,
    inline_value: Option<String>,
    tokens: &[String],
    idx: &mut usize,
) -> Result<bool, CliError> {
    match flag {
        "--config" => {
            let raw = take_flag_value(flag, inline_value, tokens, idx)?;
            overrides.config = Some(PathBuf::from(raw));
        }
        "--k" => {
            let raw = take_flag_value(flag, inline_value, tokens, idx)?;
            overrides.k = Some(parse_usize_arg(raw.as_str(), flag)?);
        }
        "--seed" => {
            let raw = take_flag_value(flag, inline_value, tokens, idx)?;
            overrides.seed = Some(parse_u64_arg(raw.as_str(), flag)?);
        }
        _ => return Ok(false),
    }
    Ok(true)
}

fn parse_postprocess_args(tokens: &[String]) -> Result<PostprocessArgs, CliError> {
    let mut args = PostprocessArgs::default();
    let mut idx = 0usize;
    while idx < tokens.len() {
        let (flag, inline_value) = split_flag(tokens[idx].as_str())?;
        match flag {
            "--input" => {
                let raw = take_flag_value(flag, inline_value, tokens, &mut idx)?;
                args.input = PathBuf::from(raw);
            }
            "--output" => {
                let raw = take_flag_value(flag, inline_value, tokens, &mut idx)?;
                args.output = Some(PathBuf::from(raw));
            }
            other => {
                if !parse_override_flag(&mut args.overrides, other, inline_value, tokens, &mut idx)?
                {
                    return Err(CliError::invalid_input(format!(
                        "unknown postprocess option '{other}'"
                    )));
                }
            }
        }
        idx += 1;
    }

    if args.input.as_os_str().is_empty() {
        return Err(CliError::invalid_input(
            "postprocess requires --input <path>",
        ));
    }

    Ok(args)
}

fn parse_export_args(tokens: &[String]) -> Result<ExportArgs, CliError> {
    let mut args = ExportArgs::default();
    let mut idx = 0usize;
    while idx < tokens.len() {
        let (flag, inline_value) = split_flag(tokens[idx].as_str())?;
        match flag {
            "--input" => {
                let raw = take_flag_value(flag, inline_value, tokens, &mut idx)?;
                args.input = PathBuf::from(raw);
            }
            "--task" => {
                let raw = take_flag_value(flag, inline_value, tokens, &mut idx)?;
                args.task = ExportTask::parse(raw.as_str())?;
            }
            "--dim" => {
                let raw = take_flag_value(flag, inline_value, tokens, &mut idx)?;
                args.dim = Some(parse_usize_arg(raw.as_str(), flag)?);
            }
            "--missing-change-point" => {
                let raw = take_flag_value(flag, inline_value, tokens, &mut idx)?;
                args.missing_change_point = Some(parse_usize_arg(raw.as_str(), flag)?);
            }
            "--output" => {
                let raw = take_flag_value(flag, inline_value, tokens, &mut idx)?;
                args.output = Some(PathBuf::from(raw));
            }
            other => {
                if !parse_override_flag(&mut args.overrides, other, inline_value, tokens, &mut idx)?
                {
                    return Err(CliError::invalid_input(format!(
                        "unknown export option '{other}'"
                    )));
                }
            }
        }
        idx += 1;
    }

    if args.input.as_os_str().is_empty() {
        return Err(CliError::invalid_input("export requires --input <path>"));
    }

    Ok(args)
}

fn parse_eval_args(tokens: &[String]) -> Result<EvalArgs, CliError> {
    let mut args = EvalArgs::default();
    let mut idx = 0usize;
    while idx < tokens.len() {
        let (flag, inline_value) = split_flag(tokens[idx].as_str())?;
        match flag {
            "--predictions" => {
                let raw = take_flag_value(flag, inline_value, tokens, &mut idx)?;
                args.predictions = PathBuf::from(raw);
            }
            "--ground-truth" => {
                let raw = take_flag_value(flag, inline_value, tokens, &mut idx)?;
                args.ground_truth = PathBuf::from(raw);
            }
            "--threshold" => {
                let raw = take_flag_value(flag, inline_value, tokens, &mut idx)?;
                args.threshold = parse_usize_arg(raw.as_str(), flag)?;
            }
            "--output" => {
                let raw = take_flag_value(flag, inline_value, tokens, &mut idx)?;
                args.output = Some(PathBuf::from(raw));
            }
            other => {
                return Err(CliError::invalid_input(format!(
                    "unknown eval option '{other}'"
                )));
            }
        }
        idx += 1;
    }

    if args.predictions.as_os_str().is_empty() {
        return Err(CliError::invalid_input(
            "eval requires --predictions <path>",
        ));
    }
    if args.ground_truth.as_os_str().is_empty() {
        return Err(CliError::invalid_input(
            "eval requires --ground-truth <path>",
        ));
    }

    Ok(args)
}

fn split_flag(token: &str) -> Result<(&str, Option<String>), CliError> {
    if !token.starts_with("--") {
        return Err(CliError::invalid_input(format!(
            "unexpected positional argument '{token}'; expected --flag value"
        )));
    }
    if let Some((flag, value)) = token.split_once('=') {
        return Ok((flag, Some(value.to_string())));
    }
    Ok((token, None))
}

fn take_flag_value(
    flag: &str,
    inline_value: Option<String>,
    tokens: &[String],
    idx: &mut usize,
) -> Result<String, CliError> {
    if let Some(value) = inline_value {
        return Ok(value);
    }

    *idx += 1;
    let value = tokens
        .get(*idx)
        .ok_or_else(|| CliError::invalid_input(format!("{flag} requires a value")))?;
    if value.starts_with("--") {
        return Err(CliError::invalid_input(format!(
            "{flag} requires a value, but got option '{value}'"
        )));
    }
    Ok(value.clone())
}

fn parse_usize_arg(raw: &str, flag: &str) -> Result<usize, CliError> {
    raw.parse::<usize>().map_err(|_| {
        CliError::invalid_input(format!(
            "{flag} expects a non-negative integer, got '{raw}'"
        ))
    })
}

fn parse_u64_arg(raw: &str, flag: &str) -> Result<u64, CliError> {
    raw.parse::<u64>().map_err(|_| {
        CliError::invalid_input(format!(
            "{flag} expects a non-negative integer, got '{raw}'"
        ))
    })
}

fn print_version() {
    println!("trajseg {}", env!("CARGO_PKG_VERSION"));
}

fn print_root_help() {
    println!(
        "trajseg {}\n\nUSAGE:\n  trajseg <COMMAND> [OPTIONS]\n\nCOMMANDS:\n  postprocess   Reduce per-timestep predictions to k change points\n  export        Write challenge submission lines\n  eval          Score predicted change points against ground truth\n\nGLOBAL OPTIONS:\n  -h, --help      Show help\n  -V, --version   Show version\n\nRun 'trajseg <COMMAND> --help' for subcommand options.",
        env!("CARGO_PKG_VERSION")
    );
}

fn print_command_help(command: &str) -> Result<(), CliError> {
    match command {
        "postprocess" => {
            println!(
                "USAGE:\n  trajseg postprocess --input <path> [OPTIONS]\n\nOPTIONS:\n  --input <path>        Required predictions JSON\n  --config <path>       Pipeline config JSON (bare or pipeline_config envelope)\n  --k <usize>           Target change points per trajectory (overrides config)\n  --seed <u64>          Tie-break seed (overrides config)\n  --output <path>       Write JSON output to file"
            );
            Ok(())
        }
        "export" => {
            println!(
                "USAGE:\n  trajseg export --input <path> [OPTIONS]\n\nOPTIONS:\n  --input <path>                    Required predictions JSON\n  --task <models|alpha|segmentation-alpha>   Default: models\n  --dim <usize>                     Trajectory dimension (overrides config)\n  --missing-change-point <usize>    Sentinel for single segments (overrides config)\n  --config <path>                   Pipeline config JSON\n  --k <usize>                       Target change points (overrides config)\n  --seed <u64>                      Tie-break seed (overrides config)\n  --output <path>                   Write submission text to file"
            );
            Ok(())
        }
        "eval" => {
            println!(
                "USAGE:\n  trajseg eval --predictions <path> --ground-truth <path> [OPTIONS]\n\nOPTIONS:\n  --predictions <path>     Required change points JSON\n  --ground-truth <path>    Required change points JSON\n  --threshold <usize>      Default: 5\n  --output <path>          Write JSON output to file"
            );
            Ok(())
        }
        _ => Err(CliError::invalid_input(format!(
            "unknown command '{command}'; expected one of: postprocess, export, eval"
        ))),
    }
}

fn handle_postprocess(args: PostprocessArgs) -> Result<(), CliError> {
    let config = resolve_config(&args.overrides)?;
    let predictions = parse_predictions(&read_json_value(args.input.as_path())?)?;
    let outcomes = postprocess_batch(&predictions, &config)?;

    write_json_output(
        &PostprocessOutput {
            command: "postprocess",
            change_points: outcomes
                .iter()
                .map(|outcome| outcome.change_points().to_vec())
                .collect(),
            config,
            outcomes,
        },
        args.output.as_deref(),
    )
}

fn handle_export(args: ExportArgs) -> Result<(), CliError> {
    let mut config = resolve_config(&args.overrides)?;
    if let Some(dim) = args.dim {
        config.export.dim = dim;
    }
    if let Some(missing) = args.missing_change_point {
        config.export.missing_change_point = missing;
    }
    let predictions = parse_predictions(&read_json_value(args.input.as_path())?)?;
    let lines = export_lines(&predictions, args.task, &config)?;
    write_text_output(&render_submission(&lines), args.output.as_deref())
}

fn handle_eval(args: EvalArgs) -> Result<(), CliError> {
    let predicted = extract_change_point_lists(
        &read_json_value(args.predictions.as_path())?,
        "predictions",
    )?;
    let truth = extract_change_point_lists(
        &read_json_value(args.ground_truth.as_path())?,
        "ground-truth",
    )?;
    let report = evaluate_batch(&truth, &predicted, args.threshold)?;

    write_json_output(
        &EvalOutput {
            command: "eval",
            report,
        },
        args.output.as_deref(),
    )
}

fn resolve_config(overrides: &PipelineOverrides) -> Result<PipelineConfig, CliError> {
    let mut config = match overrides.config.as_deref() {
        Some(path) => {
            let raw = fs::read_to_string(path).map_err(|source| {
                CliError::io(format!("failed to read '{}'", path.display()), source)
            })?;
            parse_pipeline_config(raw.as_str())?
        }
        None => PipelineConfig::default(),
    };
    if let Some(k) = overrides.k {
        config.postprocess.n_change_points = k;
    }
    if let Some(seed) = overrides.seed {
        config.postprocess.seed = seed;
    }
    Ok(config)
}

/// Accepts a bare array or `{"predictions": [...]}`; a bare integer array
/// is read as labels.
fn parse_predictions(value: &Value) -> Result<Vec<Prediction>, CliError> {
    let items = value
        .as_array()
        .or_else(|| {
            value
                .as_object()
                .and_then(|obj| obj.get("predictions"))
                .and_then(Value::as_array)
        })
        .ok_or_else(|| {
            CliError::invalid_input(
                "predictions JSON must be an array or an object with a 'predictions' array",
            )
        })?;

    items
        .iter()
        .enumerate()
        .map(|(idx, item)| {
            if item.is_array() {
                let labels = parse_usize_array(item, &format!("predictions[{idx}]"))?;
                return Ok(Prediction::Labels(labels));
            }
            serde_json::from_value(item.clone()).map_err(|source| {
                CliError::json(format!("failed to parse predictions[{idx}]"), source)
            })
        })
        .collect()
}

/// Accepts an array of change-point arrays or an object carrying one under
/// `change_points`, which includes `postprocess` output.
fn extract_change_point_lists(value: &Value, context: &str) -> Result<Vec<Vec<usize>>, CliError> {
    let (lists, context) = match value.as_object().and_then(|obj| obj.get("change_points")) {
        Some(lists) => (lists, format!("{context}.change_points")),
        None => (value, context.to_string()),
    };
    let array = lists
        .as_array()
        .ok_or_else(|| CliError::invalid_input(format!("{context} must be an array of arrays")))?;
    array
        .iter()
        .enumerate()
        .map(|(idx, item)| parse_usize_array(item, &format!("{context}[{idx}]")))
        .collect()
}

fn parse_usize_array(value: &Value, context: &str) -> Result<Vec<usize>, CliError> {
    let array = value
        .as_array()
        .ok_or_else(|| CliError::invalid_input(format!("{context} must be an array")))?;
    array
        .iter()
        .enumerate()
        .map(|(idx, item)| {
            item.as_u64()
                .and_then(|raw| usize::try_from(raw).ok())
                .ok_or_else(|| {
                    CliError::invalid_input(format!(
                        "{context}[{idx}] must be a non-negative integer; got {item}"
                    ))
                })
        })
        .collect()
}

fn read_json_value(path: &Path) -> Result<Value, CliError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| CliError::io(format!("failed to read '{}'", path.display()), source))?;
    serde_json::from_str(raw.as_str())
        .map_err(|source| CliError::json(format!("invalid JSON in '{}'", path.display()), source))
}

fn write_json_output<T: Serialize>(
    payload: &T,
    output_path: Option<&Path>,
) -> Result<(), CliError> {
    let encoded = serde_json::to_string_pretty(payload)
        .map_err(|source| CliError::json("failed to serialize JSON output", source))?;
    write_text_output(&format!("{encoded}\n"), output_path)
}

fn write_text_output(body: &str, output_path: Option<&Path>) -> Result<(), CliError> {
    if let Some(path) = output_path {
        fs::write(path, body)
            .map_err(|source| CliError::io(format!("failed to write '{}'", path.display()), source))
    } else {
        print!("{body}");
        Ok(())
    }
}

fn emit_structured_error(err: &CliError) {
    let envelope = ErrorEnvelope {
        error: ErrorPayload {
            code: err.code().to_string(),
            message: err.to_string(),
        },
    };

    match serde_json::to_string_pretty(&envelope) {
        Ok(json) => eprintln!("{json}"),
        Err(_) => eprintln!(
            "{{\"error\":{{\"code\":\"{}\",\"message\":\"{}\"}}}}",
            err.code(),
            err
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::{
        CliError, Command, PipelineOverrides, extract_change_point_lists, parse_cli,
        parse_eval_args, parse_export_args, parse_postprocess_args, parse_predictions,
        resolve_config,
    };
    use serde_json::json;
    use std::path::PathBuf;
    use trajseg_cli::{ExportTask, Prediction};
    use trajseg_core::SegError;

    fn tokens(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|token| token.to_string()).collect()
    }

    #[test]
    fn postprocess_args_accept_inline_and_separate_values() {
        let args = parse_postprocess_args(&tokens(&[
            "--input",
            "preds.json",
            "--k=2",
            "--seed",
            "9",
            "--output=out.json",
        ]))
        .expect("postprocess args should parse");
        assert_eq!(args.input, PathBuf::from("preds.json"));
        assert_eq!(args.overrides.k, Some(2));
        assert_eq!(args.overrides.seed, Some(9));
        assert_eq!(args.output, Some(PathBuf::from("out.json")));
    }

    #[test]
    fn postprocess_requires_input() {
        let err = parse_postprocess_args(&tokens(&["--k", "1"])).expect_err("missing input");
        assert!(err.to_string().contains("--input"));
        assert_eq!(err.code(), "invalid_input");
    }

    #[test]
    fn flag_values_are_validated() {
        let err = parse_postprocess_args(&tokens(&["--input", "p.json", "--k", "-1"]))
            .expect_err("negative k must fail");
        assert!(err.to_string().contains("non-negative integer"));

        let err = parse_postprocess_args(&tokens(&["--input", "--k"]))
            .expect_err("flag in value position must fail");
        assert!(err.to_string().contains("requires a value"));

        let err = parse_eval_args(&tokens(&["predictions.json"]))
            .expect_err("positional argument must fail");
        assert!(err.to_string().contains("unexpected positional argument"));
    }

    #[test]
    fn export_args_parse_task_and_dim() {
        let args = parse_export_args(&tokens(&[
            "--input",
            "signals.json",
            "--task",
            "segmentation-alpha",
            "--dim",
            "3",
            "--missing-change-point=200",
        ]))
        .expect("export args should parse");
        assert_eq!(args.task, ExportTask::SegmentationAlpha);
        assert_eq!(args.dim, Some(3));
        assert_eq!(args.missing_change_point, Some(200));

        let err = parse_export_args(&tokens(&["--input", "x.json", "--task", "bogus"]))
            .expect_err("unknown task must fail");
        assert!(matches!(err, CliError::Seg(SegError::InvalidInput(_))));
    }

    #[test]
    fn eval_args_default_threshold_is_five() {
        let args = parse_eval_args(&tokens(&[
            "--predictions",
            "p.json",
            "--ground-truth",
            "t.json",
        ]))
        .expect("eval args should parse");
        assert_eq!(args.threshold, 5);
        let err = parse_eval_args(&tokens(&["--predictions", "p.json"]))
            .expect_err("missing ground truth");
        assert!(err.to_string().contains("--ground-truth"));
    }

    #[test]
    fn unknown_commands_are_rejected() {
        let parsed = parse_cli(&tokens(&["postprocess", "--input", "p.json"]))
            .expect("postprocess should parse")
            .expect("a command should be returned");
        assert!(matches!(parsed.command, Command::Postprocess(_)));

        let err = match parse_cli(&tokens(&["detect"])) {
            Ok(_) => panic!("detect is not a trajseg command"),
            Err(err) => err,
        };
        assert!(err.to_string().contains("postprocess, export, eval"));
    }

    #[test]
    fn overrides_apply_on_top_of_defaults() {
        let config = resolve_config(&PipelineOverrides {
            config: None,
            k: Some(3),
            seed: Some(11),
        })
        .expect("defaults should resolve");
        assert_eq!(config.postprocess.n_change_points, 3);
        assert_eq!(config.postprocess.seed, 11);
        assert_eq!(config.export.missing_change_point, 100);
    }

    #[test]
    fn missing_config_file_is_an_io_error() {
        let err = resolve_config(&PipelineOverrides {
            config: Some(PathBuf::from("/nonexistent/trajseg/config.json")),
            ..PipelineOverrides::default()
        })
        .expect_err("missing file must fail");
        assert_eq!(err.code(), "io_error");
    }

    #[test]
    fn predictions_accept_bare_label_arrays_and_tagged_objects() {
        let parsed = parse_predictions(&json!({
            "predictions": [[0, 0, 1], {"signal": [0.5, 0.7]}]
        }))
        .expect("predictions should parse");
        assert_eq!(parsed[0], Prediction::Labels(vec![0, 0, 1]));
        assert_eq!(parsed[1], Prediction::Signal(vec![0.5, 0.7]));

        let err = parse_predictions(&json!([[0, -1]])).expect_err("negative label must fail");
        assert!(err.to_string().contains("predictions[0][1]"));
        let err = parse_predictions(&json!({"labels": [0]})).expect_err("no array to read");
        assert_eq!(err.code(), "invalid_input");
    }

    #[test]
    fn change_point_lists_read_postprocess_output() {
        let lists = extract_change_point_lists(
            &json!({"command": "postprocess", "change_points": [[10], []]}),
            "predictions",
        )
        .expect("postprocess output should be readable");
        assert_eq!(lists, vec![vec![10], vec![]]);

        let lists = extract_change_point_lists(&json!([[3, 7]]), "ground-truth")
            .expect("bare arrays should be readable");
        assert_eq!(lists, vec![vec![3, 7]]);

        let err = extract_change_point_lists(&json!({"change_points": [5]}), "ground-truth")
            .expect_err("flat array must fail");
        assert!(err.to_string().contains("ground-truth.change_points[0]"));
    }
}
