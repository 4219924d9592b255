//! Offline model check: classify one image, or score the model against
//! folders of labeled images and save the report.

use std::path::{Path, PathBuf};

use clap::{CommandFactory, Parser};
use image::imageops::FilterType;
use serde_json::json;

use vrikzo_cnn::config::ModelConfig;
use vrikzo_cnn::evaluation::{
    evaluate_folder, evaluate_folders, evaluate_image, existing_test_folders, EvaluationRecord,
    EvaluationReport, MatchMode, AUTO_TEST_PATHS, DEFAULT_OUTPUT,
};
use vrikzo_cnn::logging::{self, LogTarget};
use vrikzo_cnn::{ClassifierContext, LABELS_PATH, MODEL_PATH};

const RULE_WIDTH: usize = 70;

#[derive(Parser, Debug)]
#[command(name = "evaluate")]
#[command(version)]
#[command(about = "Test the plant classifier on an image or on labeled folders")]
struct Cli {
    /// Image file, or a folder with one sub-folder per class
    target: Option<PathBuf>,

    /// Evaluate the built-in test folders
    #[arg(long)]
    auto: bool,

    /// ONNX model file
    #[arg(long, default_value = MODEL_PATH, env = "VRIKZO_MODEL")]
    model: PathBuf,

    /// JSON array of class names
    #[arg(long, default_value = LABELS_PATH, env = "VRIKZO_LABELS")]
    labels: PathBuf,

    /// Where folder and auto runs save their report
    #[arg(long, default_value = DEFAULT_OUTPUT)]
    output: PathBuf,

    /// How a class folder name is matched against the predicted label
    #[arg(long = "match", value_enum, default_value_t = MatchMode::Substring)]
    match_mode: MatchMode,

    /// Default log filter when RUST_LOG is unset
    #[arg(long, default_value = "warn")]
    log_level: String,
}

enum Mode<'a> {
    Auto(Vec<&'a Path>),
    Image(PathBuf),
    Folder(PathBuf),
}

fn rule() -> String {
    "=".repeat(RULE_WIDTH)
}

fn header(title: &str) {
    println!("\n{}", rule());
    println!("{title}");
    println!("{}", rule());
}

fn print_json(value: &serde_json::Value) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_usage() {
    let bin = Cli::command().get_name().to_string();
    header("USAGE:");
    println!("\n1. Test single image:");
    println!("   {bin} image.jpg");
    println!("\n2. Test folder of images:");
    println!("   {bin} /path/to/test/folder");
    println!("\n3. Test with default paths:");
    println!("   {bin} --auto");
    println!("\n{}", rule());
}

fn load_context(cli: &Cli) -> anyhow::Result<ClassifierContext> {
    let config = ModelConfig {
        model_path: cli.model.clone(),
        labels_path: cli.labels.clone(),
        input_size: None,
        resize_filter: FilterType::Nearest,
    };

    println!("\n🔄 Loading model and class names...");
    match ClassifierContext::load(&config) {
        Ok(context) => {
            let size = context.input_size();
            println!("✅ Loaded {} classes", context.labels().len());
            println!("📐 Image size: ({}, {})", size.height, size.width);
            Ok(context)
        }
        Err(e) => {
            print_json(&json!({ "error": e.to_string() }))?;
            Err(e.into())
        }
    }
}

fn save_report(records: Vec<EvaluationRecord>, output: &Path) -> anyhow::Result<()> {
    if records.is_empty() {
        println!("\nNo images evaluated, nothing to save");
        return Ok(());
    }

    let report = EvaluationReport::new(records);
    header("📊 RESULTS");
    println!("{}", report.to_json()?);

    report.write_to(output)?;
    println!("\n💾 Results saved to: {}", output.display());
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init(&cli.log_level, LogTarget::Stderr);

    println!("{}", rule());
    println!("🌿 VRIKZO MODEL TESTING");
    println!("{}", rule());

    let mode = match (&cli.target, cli.auto) {
        (_, true) => {
            let folders = existing_test_folders(AUTO_TEST_PATHS);
            for skipped in AUTO_TEST_PATHS.iter().filter(|p| !Path::new(p).is_dir()) {
                println!("⏭️  Skipping missing folder: {skipped}");
            }
            if folders.is_empty() {
                println!("\nNo test folders found, nothing to evaluate");
                println!("\n{}", rule());
                return Ok(());
            }
            Mode::Auto(folders)
        }
        (None, false) => {
            print_usage();
            return Ok(());
        }
        (Some(path), false) if path.is_file() => Mode::Image(path.clone()),
        (Some(path), false) if path.is_dir() => Mode::Folder(path.clone()),
        (Some(path), false) => {
            print_json(&json!({ "error": format!("Path not found: {}", path.display()) }))?;
            println!("\n{}", rule());
            return Ok(());
        }
    };

    let context = load_context(&cli)?;

    match mode {
        Mode::Auto(folders) => {
            println!("\n🔄 Running automatic tests...");
            for folder in &folders {
                println!("📂 Testing: {}", folder.display());
            }
            let records = evaluate_folders(&context, &folders, cli.match_mode);
            save_report(records, &cli.output)?;
        }
        Mode::Image(path) => {
            println!("\n🔄 Testing single image: {}", path.display());
            let record = evaluate_image(&context, &path);
            header("📊 RESULT");
            print_json(&serde_json::to_value(&record)?)?;
        }
        Mode::Folder(path) => {
            println!("\n🔄 Testing folder: {}", path.display());
            let records = evaluate_folder(&context, &path, cli.match_mode)?;
            save_report(records, &cli.output)?;
        }
    }

    println!("\n{}", rule());
    Ok(())
}
