use sumi::{error, logging, App, EditorConfig};

fn main() -> sumi::Result<()> {
    error::setup_panic_handler();
    logging::init(log::LevelFilter::Info);

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.iter().any(|arg| arg == "--version") {
        println!("sumi version {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let mut config = EditorConfig::load()?;
    let file_arg = config.apply_args(args.into_iter())?;

    let mut app = App::new(config, file_arg);
    app.run()
}
