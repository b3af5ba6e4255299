mod cli;

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(options) = cli::DemoOptions::parse(&args) else {
        eprintln!("usage: petalsfx-demo [--music <track>] [--plays <n>] <sfx file>...");
        std::process::exit(2);
    };

    cli::run(options)
}
