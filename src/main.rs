fn main() {
    if let Err(err) = digital_divide::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
