fn main() {
    if let Err(e) = indexstore_cli::run() {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
