fn main() {
    match storemaint::cli::run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            storemaint::ui::eprintln_error(&err);
            std::process::exit(storemaint::exit::exit_code(&err));
        }
    }
}
