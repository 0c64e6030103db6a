fn main() {
    if let Err(error) = nurseryflow_cli::run() {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}
