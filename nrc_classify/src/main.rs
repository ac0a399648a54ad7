extern crate clap;
extern crate context_model;
extern crate nrc_classify;
extern crate rayon;
#[macro_use]
extern crate log;
extern crate env_logger;
use clap::{App, Arg};
use context_model::FiniteContextModel;
use std::fs;
use std::io::BufWriter;

fn main() -> std::io::Result<()> {
    let matches = App::new("nrc_classify")
        .version("0.1")
        .author("Bansho Masutani")
        .about("Ranking database sequences by compressibility under a reference-trained model.")
        .arg(
            Arg::with_name("database")
                .required(true)
                .short("d")
                .long("database")
                .value_name("DATABASE")
                .help("Sequence database<@-delimited records>")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("reference")
                .required(true)
                .short("r")
                .long("reference")
                .value_name("REFERENCE")
                .help("Reference sequence<raw text>")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("context")
                .short("k")
                .long("context")
                .required(false)
                .value_name("CONTEXT")
                .help("Context length of the model.")
                .default_value(&"2")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("alpha")
                .short("a")
                .long("alpha")
                .required(false)
                .value_name("ALPHA")
                .help("Smoothing constant.")
                .default_value(&"1.0")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("top")
                .short("t")
                .long("top")
                .required(false)
                .value_name("TOP")
                .help("Number of top results to report.")
                .default_value(&"20")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("threads")
                .long("threads")
                .required(false)
                .value_name("THREADS")
                .help("Number of threads (0 = all cores).")
                .default_value(&"0")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("csv")
                .long("csv")
                .help("Comma separated output instead of tabs."),
        )
        .arg(
            Arg::with_name("verbose")
                .short("v")
                .multiple(true)
                .help("Output debug to the standard error."),
        )
        .get_matches();
    let level = match matches.occurrences_of("verbose") {
        0 => "warn",
        1 => "info",
        2 => "debug",
        3 | _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
    let k: usize = matches
        .value_of("context")
        .and_then(|num| num.parse().ok())
        .expect("context length must be a non-negative integer");
    let alpha: f64 = matches
        .value_of("alpha")
        .and_then(|num| num.parse().ok())
        .expect("alpha must be a number");
    assert!(alpha > 0., "alpha must be positive");
    let top: usize = matches
        .value_of("top")
        .and_then(|num| num.parse().ok())
        .expect("top must be a non-negative integer");
    let threads: usize = matches
        .value_of("threads")
        .and_then(|num| num.parse().ok())
        .expect("threads must be a non-negative integer");
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .unwrap();
    debug!("Started. k={}, alpha={}, top={}", k, alpha, top);
    let reference_file = matches.value_of("reference").unwrap();
    let reference = match fs::read(reference_file) {
        Ok(res) => res,
        Err(why) => panic!("{}:{}", why, reference_file),
    };
    let reference = nrc_classify::filter_bases(&reference);
    debug!("Reference:{} bases after filtering.", reference.len());
    let model = FiniteContextModel::new(&reference, k, alpha);
    let database_file = matches.value_of("database").unwrap();
    let database = match fs::read(database_file) {
        Ok(res) => res,
        Err(why) => panic!("{}:{}", why, database_file),
    };
    let mut records = nrc_classify::parse_database(&database);
    info!("Database:{} records.", records.len());
    let workers = rayon::current_num_threads();
    nrc_classify::score_records(&mut records, &model, workers);
    let records = nrc_classify::rank(records, top);
    info!("Reporting {} records.", records.len());
    let out = std::io::stdout();
    let mut out = BufWriter::new(out.lock());
    nrc_classify::write_results(&mut out, &records, matches.is_present("csv"))?;
    Ok(())
}
