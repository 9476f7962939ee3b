use env_logger::{Env, Target};

fn main() {
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .target(Target::Stderr)
        .init();

    if let Err(err) = bugrisk_lib::run() {
        eprintln!("Error: {err:#}");
        std::process::exit(1);
    }
}
