fn main() {
    if let Err(err) = oraverify::cli::run() {
        oraverify::ui::eprintln_error(&err);
        std::process::exit(oraverify::exit::exit_code(&err));
    }
}
