fn main() {
    if let Err(err) = boar_lookup::run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
