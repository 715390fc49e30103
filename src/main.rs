use siho::cli::CliOverrides;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = match CliOverrides::parse_from_env() {
        Ok(parsed) => parsed,
        Err(err) => {
            eprintln!("[cli] {err}");
            std::process::exit(2);
        }
    };
    match siho::probe::run(&cli) {
        Ok(report) => println!("{report}"),
        Err(err) => {
            eprintln!("Probe error: {err:?}");
            std::process::exit(1);
        }
    }
}
