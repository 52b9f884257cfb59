#![forbid(unsafe_code)]

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::process::ExitCode;

use chrono::NaiveDate;
use orderlens::{
    DashboardConfig, FilterSpec, IngestPolicy, analyze_range, load_table, write_orders_csv_path,
};

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, Default)]
struct CliArgs {
    config: Option<PathBuf>,
    csv: Option<PathBuf>,
    synthetic_rows: Option<usize>,
    seed: Option<u64>,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    cities: BTreeSet<String>,
    products: BTreeSet<String>,
    hardened: Option<Option<usize>>,
    json: bool,
    export: Option<PathBuf>,
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("orderlens-cli error: {error}");
            ExitCode::from(1)
        }
    }
}

fn run() -> Result<(), String> {
    let args = parse_args()?;
    let config = resolve_config(&args)?;

    let loaded = load_table(&config).map_err(|error| error.to_string())?;
    if !loaded.ledger.is_empty() {
        eprintln!(
            "ingest dropped_rows={}\n{}",
            loaded.ledger.dropped_rows(),
            loaded.ledger.render_plain()
        );
    }
    let table = loaded.table;

    let covering = FilterSpec::covering(&table);
    let start = args
        .start
        .or_else(|| covering.as_ref().map(|spec| spec.date_range.start()))
        .ok_or_else(|| "table is empty; pass --start and --end".to_owned())?;
    let end = args
        .end
        .or_else(|| covering.as_ref().map(|spec| spec.date_range.end()))
        .ok_or_else(|| "table is empty; pass --start and --end".to_owned())?;
    let cities = if args.cities.is_empty() {
        table.distinct_cities()
    } else {
        args.cities.clone()
    };
    let products = (!args.products.is_empty()).then_some(&args.products);

    let analysis = analyze_range(&table, start, end, &cities, products)
        .map_err(|error| error.to_string())?;

    if args.json {
        let body = serde_json::to_string_pretty(&analysis.summary())
            .map_err(|error| error.to_string())?;
        println!("{body}");
    } else {
        print!("{}", analysis.render_plain());
    }

    if let Some(path) = args.export.as_ref().or(config.export_path.as_ref()) {
        write_orders_csv_path(&analysis.filtered, path).map_err(|error| error.to_string())?;
        eprintln!(
            "exported rows={} path={}",
            analysis.filtered.len(),
            path.display()
        );
    }

    Ok(())
}

fn resolve_config(args: &CliArgs) -> Result<DashboardConfig, String> {
    let mut config = match args.config.as_deref() {
        Some(path) => DashboardConfig::from_path(path).map_err(|error| error.to_string())?,
        None => DashboardConfig::default(),
    };

    if let Some(path) = &args.csv {
        config.csv_path = Some(path.clone());
    }
    if let Some(rows) = args.synthetic_rows {
        config.csv_path = None;
        config.synthetic.rows = rows;
    }
    if let Some(seed) = args.seed {
        config.synthetic.seed = seed;
    }
    if let Some(cap) = args.hardened {
        config.ingest = IngestPolicy::hardened(cap);
    }
    Ok(config)
}

fn parse_args() -> Result<CliArgs, String> {
    let mut parsed = CliArgs::default();

    let mut args = std::env::args().skip(1).peekable();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => {
                let value = args
                    .next()
                    .ok_or_else(|| "--config requires a path".to_owned())?;
                parsed.config = Some(PathBuf::from(value));
            }
            "--csv" => {
                let value = args
                    .next()
                    .ok_or_else(|| "--csv requires a path".to_owned())?;
                parsed.csv = Some(PathBuf::from(value));
            }
            "--synthetic" => {
                let value = args
                    .next()
                    .ok_or_else(|| "--synthetic requires a row count".to_owned())?;
                parsed.synthetic_rows = Some(
                    value
                        .parse()
                        .map_err(|_| format!("invalid row count: {value}"))?,
                );
            }
            "--seed" => {
                let value = args
                    .next()
                    .ok_or_else(|| "--seed requires a number".to_owned())?;
                parsed.seed = Some(value.parse().map_err(|_| format!("invalid seed: {value}"))?);
            }
            "--start" => {
                let value = args
                    .next()
                    .ok_or_else(|| "--start requires a date".to_owned())?;
                parsed.start = Some(parse_date(&value)?);
            }
            "--end" => {
                let value = args
                    .next()
                    .ok_or_else(|| "--end requires a date".to_owned())?;
                parsed.end = Some(parse_date(&value)?);
            }
            "--city" => {
                let value = args
                    .next()
                    .ok_or_else(|| "--city requires a name".to_owned())?;
                parsed.cities.insert(value);
            }
            "--product" => {
                let value = args
                    .next()
                    .ok_or_else(|| "--product requires a name".to_owned())?;
                parsed.products.insert(value);
            }
            "--hardened" => {
                let cap = match args.peek() {
                    Some(next) if !next.starts_with("--") => {
                        let value = args.next().unwrap_or_default();
                        Some(
                            value
                                .parse()
                                .map_err(|_| format!("invalid drop cap: {value}"))?,
                        )
                    }
                    _ => None,
                };
                parsed.hardened = Some(cap);
            }
            "--json" => {
                parsed.json = true;
            }
            "--export" => {
                let value = args
                    .next()
                    .ok_or_else(|| "--export requires a path".to_owned())?;
                parsed.export = Some(PathBuf::from(value));
            }
            "--help" | "-h" => {
                print_help();
                std::process::exit(0);
            }
            other => return Err(format!("unknown argument: {other}")),
        }
    }

    if parsed.csv.is_some() && parsed.synthetic_rows.is_some() {
        return Err("--csv and --synthetic are mutually exclusive".to_owned());
    }
    Ok(parsed)
}

fn parse_date(value: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(value, DATE_FORMAT)
        .map_err(|_| format!("invalid date {value:?}, expected YYYY-MM-DD"))
}

fn print_help() {
    println!(
        "orderlens-cli\n\
         Usage:\n\
         \torderlens-cli [--config <yaml>] [--csv <path> | --synthetic <rows>] [--seed <n>]\n\
         \t              [--start <date>] [--end <date>] [--city <name>]... [--product <name>]...\n\
         \t              [--hardened [cap]] [--json] [--export <path>]\n\
         Options:\n\
         \t--config <yaml>          dashboard config (csv_path, ingest, synthetic, export_path)\n\
         \t--csv <path>             load orders from a CSV file\n\
         \t--synthetic <rows>       generate a synthetic table with this many rows\n\
         \t--seed <n>               seed for synthetic generation (default: 42)\n\
         \t--start <date>           first day of the range, YYYY-MM-DD (default: earliest order)\n\
         \t--end <date>             last day of the range, inclusive (default: latest order)\n\
         \t--city <name>            keep this city; repeatable (default: every city)\n\
         \t--product <name>         keep this product; repeatable (default: no product filter)\n\
         \t--hardened [cap]         drop bad CSV rows instead of failing, at most <cap> of them\n\
         \t--json                   print the analysis summary as JSON\n\
         \t--export <path>          write the filtered rows as CSV\n\
         \t-h, --help               show this help"
    );
}
