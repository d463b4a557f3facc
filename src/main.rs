use kara::audio::{AudioInput, FeatureCache, FeatureEntry, FeatureKind, FeatureResult, FeatureWorker};
use kara::validate::validate_line;
use kara::{derive, EngineConfig, KaraError, Line};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::process;
use std::time::Duration;

const USAGE: &str = "Usage: kara [--config <file.yaml>] <command> [args]

Commands:
  decode <tagged-text> [start end]       Decode karaoke tags into a line (JSON)
  encode <line.json>                     Encode a line's syllables as tags
  autosplit <text> <start> <end>         Split a line evenly across its characters
  waveform <file.wav> [buckets/second]   Peak amplitudes (JSON)
  spectrogram <file.wav> [fft hop]       Log-magnitude spectrogram (JSON)";

/// Long enough for any real song; the worker reports progress meanwhile.
const EXTRACTION_TIMEOUT: Duration = Duration::from_secs(600);

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut args: Vec<String> = env::args().skip(1).collect();

    let mut config_path: Option<PathBuf> = None;
    if args.first().map(String::as_str) == Some("--config") {
        if args.len() < 2 {
            usage();
        }
        config_path = Some(PathBuf::from(args.remove(1)));
        args.remove(0);
    }

    let config = match &config_path {
        Some(path) => match EngineConfig::load(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Error loading config: {}", e);
                process::exit(1);
            }
        },
        None => EngineConfig::default(),
    };

    if args.is_empty() {
        usage();
    }

    let result = match args[0].as_str() {
        "decode" => cmd_decode(&args[1..], &config),
        "encode" => cmd_encode(&args[1..], &config),
        "autosplit" => cmd_autosplit(&args[1..]),
        "waveform" => cmd_waveform(&args[1..], &config),
        "spectrogram" => cmd_spectrogram(&args[1..], &config),
        _ => usage(),
    };

    match result {
        Ok(output) => println!("{}", output),
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    }
}

fn usage() -> ! {
    eprintln!("{}", USAGE);
    process::exit(1);
}

fn number<T: std::str::FromStr>(arg: &str) -> T {
    match arg.parse() {
        Ok(value) => value,
        Err(_) => {
            eprintln!("Not a number: '{}'", arg);
            process::exit(1);
        }
    }
}

fn report_violations(line: &Line) {
    for violation in validate_line(line) {
        eprintln!("Warning: {}", violation);
    }
}

fn cmd_decode(args: &[String], config: &EngineConfig) -> Result<String, KaraError> {
    let (source, times) = match args {
        [source] => (source, None),
        [source, start, end] => (source, Some((number::<f64>(start), number::<f64>(end)))),
        _ => usage(),
    };

    let decoded = kara::parser::decode_with_default(source, config.default_tag_duration)?;
    let (start, end) = times.unwrap_or_else(|| {
        let span = decoded
            .syllables
            .iter()
            .flatten()
            .map(|s| s.end_offset())
            .fold(0.0, f64::max);
        let span = if span > 0.0 {
            span
        } else {
            decoded.text.chars().count() as f64 * config.default_tag_duration
        };
        (0.0, span)
    });

    let line = Line {
        syllables: decoded.syllables,
        ..Line::new(decoded.text, start, end)
    };
    report_violations(&line);
    Ok(serde_json::to_string_pretty(&line)?)
}

fn cmd_encode(args: &[String], config: &EngineConfig) -> Result<String, KaraError> {
    let [path] = args else { usage() };
    let path = Path::new(path);
    let content = fs::read_to_string(path).map_err(|source| KaraError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let line: Line = serde_json::from_str(&content)?;
    report_violations(&line);
    Ok(kara::encode_line(&line, config.tag_kind))
}

fn cmd_autosplit(args: &[String]) -> Result<String, KaraError> {
    let [text, start, end] = args else { usage() };
    let line = Line::new(text.as_str(), number(start), number(end));
    let syllables = derive::auto_split(&line);
    Ok(serde_json::to_string_pretty(&line.with_syllables(syllables))?)
}

fn cmd_waveform(args: &[String], config: &EngineConfig) -> Result<String, KaraError> {
    let (path, buckets_per_second) = match args {
        [path] => (path, config.waveform_buckets_per_second),
        [path, bps] => (path, number(bps)),
        _ => usage(),
    };
    let kind = FeatureKind::Waveform { buckets_per_second };
    Ok(serde_json::to_string(&extract(Path::new(path), kind)?)?)
}

fn cmd_spectrogram(args: &[String], config: &EngineConfig) -> Result<String, KaraError> {
    let (path, fft_size, hop_size) = match args {
        [path] => (path, config.fft_size, config.hop_size),
        [path, fft, hop] => (path, number(fft), number(hop)),
        _ => usage(),
    };
    let kind = FeatureKind::Spectrogram { fft_size, hop_size };
    Ok(serde_json::to_string(&extract(Path::new(path), kind)?)?)
}

/// Run one extraction on the background worker and wait for it.
fn extract(path: &Path, kind: FeatureKind) -> Result<FeatureResult, KaraError> {
    let source_id = path.display().to_string();
    let worker = FeatureWorker::spawn().map_err(|source| KaraError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut cache = FeatureCache::new(worker);
    cache.request(&source_id, kind, || AudioInput::File(path.to_path_buf()));

    match cache.wait(kind, EXTRACTION_TIMEOUT) {
        Some(FeatureEntry::Ready(result)) => Ok(result.clone()),
        Some(FeatureEntry::Failed(message)) => Err(KaraError::Audio {
            source_id,
            message: message.clone(),
        }),
        _ => Err(KaraError::Audio {
            source_id,
            message: "feature extraction did not finish".to_string(),
        }),
    }
}
