//! Fantasy points prediction CLI
//!
//! An LSTM-based tool for forecasting next-round fantasy football points.

use clap::{Parser, Subcommand};
use fpl::{Config, Result};

#[derive(Parser)]
#[command(name = "fpl")]
#[command(about = "Fantasy football points prediction using deep learning", long_about = None)]
struct Cli {
    /// Config file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a new project with default config
    Init,
    /// Full pipeline: features, search, train, predict
    Run {
        /// Override number of training epochs
        #[arg(long)]
        epochs: Option<usize>,
    },
    /// Hyperparameter search only
    Tune,
    /// Train the configured architecture (no search)
    Train {
        /// Override number of epochs
        #[arg(long)]
        epochs: Option<usize>,
        /// Override learning rate
        #[arg(long)]
        lr: Option<f64>,
    },
    /// Predict next-round points from a saved model
    Predict {
        /// Number of players to show
        #[arg(long, default_value = "20")]
        top: usize,
        /// Output format
        #[arg(long, default_value = "table")]
        format: OutputFormat,
        /// Also write the full table to this CSV path
        #[arg(long)]
        output: Option<String>,
    },
}

#[derive(Clone, Debug)]
enum OutputFormat {
    Table,
    Json,
    Csv,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" => Ok(OutputFormat::Table),
            "json" => Ok(OutputFormat::Json),
            "csv" => Ok(OutputFormat::Csv),
            _ => Err(format!("Unknown format: {}. Use table, json, or csv.", s)),
        }
    }
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    // Load or create config
    let config = if std::path::Path::new(&cli.config).exists() {
        match Config::load(&cli.config) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Error loading config: {}", e);
                std::process::exit(1);
            }
        }
    } else {
        Config::default()
    };

    let result = match cli.command {
        Commands::Init => commands::init(&cli.config),
        Commands::Run { epochs } => commands::run(&config, epochs),
        Commands::Tune => commands::tune(&config),
        Commands::Train { epochs, lr } => commands::train(&config, epochs, lr),
        Commands::Predict {
            top,
            format,
            output,
        } => commands::predict(&config, top, format, output),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

mod commands {
    use super::*;
    use burn::backend::{Autodiff, NdArray};
    use burn::module::AutodiffModule;
    use burn::tensor::backend::Backend;
    use fpl::data::{split_with_seed, SequenceBuilder, SequenceDataset, SequenceSample, Tables};
    use fpl::features::{
        DifficultyConfig, DifficultyEngine, ExclusionReport, FeatureAssembler, FeatureVector,
        FormAggregator, NormalizationParams,
    };
    use fpl::model::PointsNetConfig;
    use fpl::predict::{format_predictions, write_predictions_csv, Predictor};
    use fpl::training::{select_best, ModelSearch, TrainOptions, Trainer};

    type MyBackend = NdArray<f32>;
    type MyAutodiffBackend = Autodiff<MyBackend>;

    pub fn init(config_path: &str) -> Result<()> {
        let config = Config::default();
        config.save(config_path)?;
        println!("Created default config at {}", config_path);

        std::fs::create_dir_all(&config.data.data_dir)?;
        std::fs::create_dir_all("model")?;
        println!("Created {}/ and model/ directories", config.data.data_dir);

        println!("\nNext steps:");
        println!("  1. Edit {} to customize settings", config_path);
        println!(
            "  2. Drop teams.csv, fixtures.csv, players.csv, player_rounds.csv into {}/",
            config.data.data_dir
        );
        println!("  3. Run 'fpl run' to search, train, and predict");

        Ok(())
    }

    /// Load tables and turn them into per-round feature vectors
    fn assemble_features(config: &Config) -> Result<(Tables, Vec<FeatureVector>, ExclusionReport)> {
        let tables = Tables::load(&config.data.data_dir)?;

        let difficulty_config = DifficultyConfig {
            window: config.features.difficulty_window,
            min_score: config.features.difficulty_min,
            max_score: config.features.difficulty_max,
        };
        let difficulty = DifficultyEngine::from_fixtures(&tables.fixtures, difficulty_config);
        let form = FormAggregator::from_rounds(&tables.rounds, config.features.form_window);

        let assembler = FeatureAssembler::new(&tables.teams, &tables.fixtures, &difficulty, &form);
        let (vectors, report) = assembler.assemble(&tables.rounds);

        println!(
            "Assembled {} feature vectors from {} records",
            vectors.len(),
            tables.rounds.len()
        );
        if !report.is_empty() {
            println!("  {}", report);
        }

        Ok((tables, vectors, report))
    }

    /// Build raw sequences, split them, and fit normalization on the
    /// training side only
    fn build_split(
        config: &Config,
        vectors: &[FeatureVector],
    ) -> Result<(Vec<SequenceSample>, Vec<SequenceSample>, NormalizationParams)> {
        let builder = SequenceBuilder::new(config.model.sequence_window);
        let raw = builder.build(vectors);

        if raw.is_empty() {
            return Err(fpl::FplError::Config(format!(
                "No training sequences: no player has {} contiguous rounds plus a target",
                config.model.sequence_window
            )));
        }

        let (train_raw, val_raw) =
            split_with_seed(raw, config.training.train_ratio, config.training.seed);
        println!(
            "Built sequences: {} train, {} validation",
            train_raw.len(),
            val_raw.len()
        );

        let params = fit_params(&train_raw);
        Ok((train_raw, val_raw, params))
    }

    fn fit_params(train_raw: &[SequenceSample]) -> NormalizationParams {
        let rows: Vec<Vec<f32>> = train_raw.iter().flat_map(|s| s.window.clone()).collect();
        let targets: Vec<f32> = train_raw.iter().map(|s| s.target).collect();
        NormalizationParams::fit(&rows, &targets)
    }

    pub fn run(config: &Config, epochs: Option<usize>) -> Result<()> {
        let mut config = config.clone();
        if let Some(e) = epochs {
            config.training.epochs = e;
        }

        let (tables, vectors, _) = assemble_features(&config)?;
        let (train_raw, val_raw, params) = build_split(&config, &vectors)?;

        let train = SequenceDataset::from_samples(&train_raw, &params);
        let val = SequenceDataset::from_samples(&val_raw, &params);

        // Search
        let device = Default::default();
        let search = ModelSearch::<MyAutodiffBackend>::new(device);
        let results = search.run(&train, &val, &config, params.target_std)?;

        print_search_results(&results);
        let best = select_best(&results).ok_or_else(|| {
            fpl::FplError::Config("all search candidates diverged".to_string())
        })?;

        // Retrain the winner on train+val; validation stays the early-stop
        // monitor for the refit
        println!("\nRetraining best configuration on all sequences...");
        let mut combined_raw = train_raw;
        combined_raw.extend(val_raw);
        let combined = SequenceDataset::from_samples(&combined_raw, &params);

        MyAutodiffBackend::seed(config.training.seed);
        let options = TrainOptions::from_config(&config.training, params.target_std);
        let trainer = Trainer::<MyAutodiffBackend>::new(
            Default::default(),
            best.candidate.model_config(),
            best.candidate.learning_rate,
        );
        let (model, history) = trainer.train(combined, val, &options)?;

        println!(
            "Training complete: best epoch {}, val loss {:.4}, val MAE {:.2} pts",
            history.best_epoch + 1,
            history.best_val_loss,
            history.val_maes.get(history.best_epoch).copied().unwrap_or(0.0)
        );

        // Save and predict
        let predictor = Predictor::new(
            model.valid(),
            params,
            Default::default(),
            config.model.sequence_window,
        );
        predictor.save(&config.data.model_path)?;
        println!("Saved model to {}", config.data.model_path);

        let (rows, skipped) = predictor.predict_all(&vectors, &tables.players);
        write_predictions_csv(&rows, &config.data.predictions_path)?;

        println!(
            "\nPredictions for {} players ({} skipped, insufficient history)",
            rows.len(),
            skipped
        );
        println!("Written to {}\n", config.data.predictions_path);
        print!("{}", format_predictions(&rows, 20));

        Ok(())
    }

    pub fn tune(config: &Config) -> Result<()> {
        let (_, vectors, _) = assemble_features(config)?;
        let (train_raw, val_raw, params) = build_split(config, &vectors)?;

        let train = SequenceDataset::from_samples(&train_raw, &params);
        let val = SequenceDataset::from_samples(&val_raw, &params);

        let device = Default::default();
        let search = ModelSearch::<MyAutodiffBackend>::new(device);
        let results = search.run(&train, &val, config, params.target_std)?;

        print_search_results(&results);

        if let Some(best) = select_best(&results) {
            println!("\nBest configuration:");
            println!("  Hidden size:   {}", best.candidate.hidden_size);
            println!("  Dense size:    {}", best.candidate.dense_size);
            println!("  Dropout:       {}", best.candidate.dropout);
            println!("  Learning rate: {}", best.candidate.learning_rate);
            println!("  Val loss:      {:.4}", best.val_loss);
            println!("  Parameters:    {}", best.param_count);
        }

        Ok(())
    }

    fn print_search_results(results: &[fpl::training::SearchResult]) {
        let best_loss = select_best(results).map(|r| r.val_loss);

        println!("\n=== Search Results ===\n");
        println!(
            "{:>8} {:>8} {:>8} {:>10} {:>10} {:>10}",
            "Hidden", "Dense", "Dropout", "LR", "ValLoss", "Params"
        );
        println!("{}", "-".repeat(60));

        for r in results {
            let marker = if Some(r.val_loss) == best_loss { " *" } else { "" };
            println!(
                "{:>8} {:>8} {:>8} {:>10} {:>10.4} {:>10}{}",
                r.candidate.hidden_size,
                r.candidate.dense_size,
                r.candidate.dropout,
                r.candidate.learning_rate,
                r.val_loss,
                r.param_count,
                marker
            );
        }
    }

    pub fn train(config: &Config, epochs: Option<usize>, lr: Option<f64>) -> Result<()> {
        let mut config = config.clone();
        if let Some(e) = epochs {
            config.training.epochs = e;
        }
        if let Some(lr) = lr {
            config.training.learning_rate = lr;
        }

        let (_, vectors, _) = assemble_features(&config)?;
        let (train_raw, val_raw, params) = build_split(&config, &vectors)?;

        let train = SequenceDataset::from_samples(&train_raw, &params);
        let val = SequenceDataset::from_samples(&val_raw, &params);

        let model_config = PointsNetConfig::from_config(&config.model);
        println!("Model config:");
        println!("  Hidden size: {}", model_config.hidden_size);
        println!("  Dense size:  {}", model_config.dense_size);
        println!("  Dropout:     {}", model_config.dropout);
        println!("  Parameters:  {}", model_config.param_count());

        MyAutodiffBackend::seed(config.training.seed);
        let options = TrainOptions::from_config(&config.training, params.target_std);
        let trainer = Trainer::<MyAutodiffBackend>::new(
            Default::default(),
            model_config,
            config.training.learning_rate,
        );
        let (model, history) = trainer.train(train, val, &options)?;

        println!("\nTraining complete!");
        println!("  Best epoch:    {}", history.best_epoch + 1);
        println!("  Best val loss: {:.4}", history.best_val_loss);
        println!(
            "  Val MAE:       {:.2} pts",
            history.val_maes.get(history.best_epoch).copied().unwrap_or(0.0)
        );

        let predictor = Predictor::new(
            model.valid(),
            params,
            Default::default(),
            config.model.sequence_window,
        );
        predictor.save(&config.data.model_path)?;
        println!("Saved model to {}", config.data.model_path);

        Ok(())
    }

    pub fn predict(
        config: &Config,
        top: usize,
        format: OutputFormat,
        output: Option<String>,
    ) -> Result<()> {
        // Burn adds .mpk to the recorder path
        let model_file = format!("{}.mpk", config.data.model_path);
        if !std::path::Path::new(&model_file).exists() {
            return Err(fpl::FplError::NoModel);
        }

        let (tables, vectors, _) = assemble_features(config)?;

        let model_config = PointsNetConfig::from_config(&config.model);
        let predictor = Predictor::<MyBackend>::load(
            &config.data.model_path,
            model_config,
            config.model.sequence_window,
            Default::default(),
        )?;

        let (rows, skipped) = predictor.predict_all(&vectors, &tables.players);
        println!(
            "Predictions for {} players ({} skipped, insufficient history)\n",
            rows.len(),
            skipped
        );

        match format {
            OutputFormat::Table => print!("{}", format_predictions(&rows, top)),
            OutputFormat::Json => {
                let shown: Vec<_> = rows.iter().take(top).collect();
                println!("{}", serde_json::to_string_pretty(&shown).unwrap_or_default());
            }
            OutputFormat::Csv => {
                println!("player_id,name,predicted_points,price");
                for row in rows.iter().take(top) {
                    println!(
                        "{},{},{:.2},{:.1}",
                        row.player.0,
                        row.name,
                        row.predicted_points,
                        row.price / 10.0
                    );
                }
            }
        }

        if let Some(path) = output {
            write_predictions_csv(&rows, &path)?;
            println!("\nFull table written to {}", path);
        }

        Ok(())
    }
}
