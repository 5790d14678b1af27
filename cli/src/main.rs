use std::error::Error;
use std::fs;
use std::io::{self, Read, Write};
use std::path::Path;

use clap::{Parser, ValueEnum};
use serde::Serialize;
use yaml_rt::{
    DumpOptions, DuplicateKeys, Indent, LoadOptions, Mode as YamlMode, Value, Warning, YamlVersion,
};

#[derive(Parser, Debug)]
#[command(name = "yrt", version, about = "Round-trip YAML formatter and converter")]
struct Args {
    /// Input file path (.yaml, .yml or .json). Omit or use '-' to read from stdin.
    input: Option<String>,

    /// Output file path (prints to stdout if omitted).
    #[arg(short, long, value_name = "file")]
    output: Option<String>,

    /// Normalise instead of keeping comments, quoting and anchors.
    #[arg(long)]
    safe: bool,

    /// Convert YAML to JSON.
    #[arg(long, conflicts_with_all = ["from_json", "check"])]
    json: bool,

    /// Convert JSON to YAML (the default for .json input).
    #[arg(long = "from-json", conflicts_with = "check")]
    from_json: bool,

    /// Only check that the input loads.
    #[arg(long)]
    check: bool,

    /// Indentation size (default: 2).
    #[arg(long, value_name = "number", default_value_t = 2)]
    indent: usize,

    /// Preferred line width (default: 80).
    #[arg(long, value_name = "number", default_value_t = 80)]
    width: usize,

    /// Start every document with '---'.
    #[arg(long = "explicit-start")]
    explicit_start: bool,

    /// Write collections in flow style unless they carry a style of their own.
    #[arg(long)]
    flow: bool,

    /// Load and dump with this YAML version.
    #[arg(long = "yaml-version", value_enum, value_name = "version")]
    yaml_version: Option<VersionArg>,

    /// What to do with repeated mapping keys: error, warn, allow (default: warn).
    #[arg(long = "duplicate-keys", value_enum, value_name = "policy", default_value_t = DuplicateKeysArg::Warn)]
    duplicate_keys: DuplicateKeysArg,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum VersionArg {
    #[value(name = "1.1")]
    V1_1,
    #[value(name = "1.2")]
    V1_2,
}

impl From<VersionArg> for YamlVersion {
    fn from(value: VersionArg) -> Self {
        match value {
            VersionArg::V1_1 => YamlVersion::V1_1,
            VersionArg::V1_2 => YamlVersion::V1_2,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum DuplicateKeysArg {
    Error,
    Warn,
    Allow,
}

impl From<DuplicateKeysArg> for DuplicateKeys {
    fn from(value: DuplicateKeysArg) -> Self {
        match value {
            DuplicateKeysArg::Error => DuplicateKeys::Error,
            DuplicateKeysArg::Warn => DuplicateKeys::Warn,
            DuplicateKeysArg::Allow => DuplicateKeys::Allow,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Mode {
    Format,
    ToJson,
    FromJson,
    Check,
}

#[derive(Debug)]
enum InputSource {
    Stdin,
    File(String),
}

fn main() {
    if let Err(err) = run() {
        eprintln!("ERROR  {err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    let (input_bytes, input_source) = read_input(args.input.as_deref())?;

    match resolve_mode(&args, &input_source) {
        Mode::Format => run_format(&args, &input_bytes, &input_source),
        Mode::ToJson => run_to_json(&args, &input_bytes, &input_source),
        Mode::FromJson => run_from_json(&args, &input_bytes, &input_source),
        Mode::Check => run_check(&args, &input_bytes, &input_source),
    }
}

fn resolve_mode(args: &Args, input_source: &InputSource) -> Mode {
    if args.check {
        return Mode::Check;
    }
    if args.json {
        return Mode::ToJson;
    }
    if args.from_json {
        return Mode::FromJson;
    }
    match input_source {
        InputSource::File(path) if has_extension(path, "json") => Mode::FromJson,
        _ => Mode::Format,
    }
}

fn has_extension(path: &str, wanted: &str) -> bool {
    Path::new(path)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(wanted))
}

fn yaml_mode(args: &Args) -> YamlMode {
    if args.safe {
        YamlMode::Safe
    } else {
        YamlMode::RoundTrip
    }
}

fn load_options(args: &Args, input_source: &InputSource) -> LoadOptions {
    let name = match input_source {
        InputSource::Stdin => "<stdin>".to_string(),
        InputSource::File(path) => path.clone(),
    };
    LoadOptions::new()
        .with_mode(yaml_mode(args))
        .with_version(args.yaml_version.map(Into::into))
        .with_duplicate_keys(args.duplicate_keys.into())
        .with_name(name)
}

fn dump_options(args: &Args, mode: YamlMode) -> DumpOptions {
    let mut options = DumpOptions::new()
        .with_mode(mode)
        .with_indent(Indent::spaces(args.indent))
        .with_width(args.width)
        .with_explicit_start(args.explicit_start)
        .with_version(args.yaml_version.map(Into::into));
    if args.flow {
        options = options.with_default_flow_style(Some(true));
    }
    options
}

fn load_documents(
    args: &Args,
    input: &[u8],
    input_source: &InputSource,
) -> Result<Vec<Value>, Box<dyn Error>> {
    let options = load_options(args, input_source);
    let mut loader = yaml_rt::Loader::from_bytes(input, &options)?;
    let documents = loader.load_all()?;
    report_warnings(&loader.take_warnings());
    Ok(documents)
}

fn run_format(args: &Args, input: &[u8], input_source: &InputSource) -> Result<(), Box<dyn Error>> {
    let documents = load_documents(args, input, input_source)?;
    let options = dump_options(args, yaml_mode(args));
    let output_target = OutputTarget::from_arg(args.output.as_deref());

    with_output_writer(output_target.path(), |writer| {
        yaml_rt::dump_to_writer(writer, &documents, &options).map_err(|err| err.into())
    })?;
    if let OutputTarget::File(path) = &output_target {
        report_status("Formatted", input_source, path);
    }
    Ok(())
}

fn run_to_json(args: &Args, input: &[u8], input_source: &InputSource) -> Result<(), Box<dyn Error>> {
    let documents = load_documents(args, input, input_source)?;
    let mut json = documents
        .iter()
        .map(Value::to_json)
        .collect::<Result<Vec<_>, _>>()?;
    let json = if json.len() == 1 {
        json.remove(0)
    } else {
        serde_json::Value::Array(json)
    };
    let output_target = OutputTarget::from_arg(args.output.as_deref());

    with_output_writer(output_target.path(), |writer| {
        write_json(writer, &json, args.indent)
    })?;
    if let OutputTarget::File(path) = &output_target {
        report_status("Converted", input_source, path);
    }
    Ok(())
}

fn run_from_json(
    args: &Args,
    input: &[u8],
    input_source: &InputSource,
) -> Result<(), Box<dyn Error>> {
    let json: serde_json::Value = serde_json::from_slice(input)?;
    let value = Value::from_json(&json);
    let options = dump_options(args, YamlMode::Safe);
    let output_target = OutputTarget::from_arg(args.output.as_deref());

    with_output_writer(output_target.path(), |writer| {
        yaml_rt::dump_to_writer(writer, std::slice::from_ref(&value), &options)
            .map_err(|err| err.into())
    })?;
    if let OutputTarget::File(path) = &output_target {
        report_status("Converted", input_source, path);
    }
    Ok(())
}

fn run_check(args: &Args, input: &[u8], input_source: &InputSource) -> Result<(), Box<dyn Error>> {
    let documents = load_documents(args, input, input_source)?;
    let label = input_label(input_source);
    let noun = if documents.len() == 1 {
        "document"
    } else {
        "documents"
    };
    println!("✔ {label}: {} {noun}", documents.len());
    Ok(())
}

fn report_warnings(warnings: &[Warning]) {
    for warning in warnings {
        eprintln!("WARN  {warning}");
    }
}

fn read_input(input: Option<&str>) -> Result<(Vec<u8>, InputSource), Box<dyn Error>> {
    match input {
        None | Some("-") => {
            let mut buf = Vec::new();
            io::stdin().read_to_end(&mut buf)?;
            Ok((buf, InputSource::Stdin))
        }
        Some(path) => {
            let buf = fs::read(path)?;
            Ok((buf, InputSource::File(path.to_string())))
        }
    }
}

#[derive(Clone, Debug)]
enum OutputTarget {
    Stdout,
    File(String),
}

impl OutputTarget {
    fn from_arg(output: Option<&str>) -> Self {
        match output {
            Some(path) if path != "-" => OutputTarget::File(path.to_string()),
            _ => OutputTarget::Stdout,
        }
    }

    fn path(&self) -> Option<&str> {
        match self {
            OutputTarget::Stdout => None,
            OutputTarget::File(path) => Some(path.as_str()),
        }
    }
}

fn with_output_writer<F>(path: Option<&str>, f: F) -> Result<(), Box<dyn Error>>
where
    F: FnOnce(&mut dyn Write) -> Result<(), Box<dyn Error>>,
{
    match path {
        Some(path) if path != "-" => {
            let mut file = fs::File::create(path)?;
            f(&mut file)
        }
        _ => {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            f(&mut handle)
        }
    }
}

fn write_json(
    writer: &mut dyn Write,
    value: &serde_json::Value,
    indent: usize,
) -> Result<(), Box<dyn Error>> {
    if indent == 0 {
        serde_json::to_writer(&mut *writer, value)?;
    } else {
        let indent_bytes = vec![b' '; indent];
        let formatter = serde_json::ser::PrettyFormatter::with_indent(&indent_bytes);
        let mut serializer = serde_json::Serializer::with_formatter(&mut *writer, formatter);
        value.serialize(&mut serializer)?;
    }
    writer.write_all(b"\n")?;
    Ok(())
}

fn input_label(input_source: &InputSource) -> String {
    match input_source {
        InputSource::Stdin => "stdin".to_string(),
        InputSource::File(path) => display_path(path),
    }
}

fn report_status(verb: &str, input_source: &InputSource, output_path: &str) {
    let input_label = input_label(input_source);
    let output_label = display_path(output_path);
    println!("✔ {verb} {input_label} → {output_label}");
}

fn display_path(path: &str) -> String {
    let path = Path::new(path);
    let Ok(cwd) = std::env::current_dir() else {
        return path.to_string_lossy().into_owned();
    };
    let abs = if path.is_absolute() {
        path.to_path_buf()
    } else {
        cwd.join(path)
    };
    let rel = diff_paths(&abs, &cwd).unwrap_or(abs);
    rel.to_string_lossy().into_owned()
}

fn diff_paths(path: &Path, base: &Path) -> Option<std::path::PathBuf> {
    let path_components: Vec<_> = path.components().collect();
    let base_components: Vec<_> = base.components().collect();

    if path_components.first()? != base_components.first()? {
        return None;
    }

    let mut common = 0;
    while common < path_components.len()
        && common < base_components.len()
        && path_components[common] == base_components[common]
    {
        common += 1;
    }

    let mut result = std::path::PathBuf::new();
    for _ in common..base_components.len() {
        result.push("..");
    }
    for component in &path_components[common..] {
        result.push(component.as_os_str());
    }

    Some(result)
}
