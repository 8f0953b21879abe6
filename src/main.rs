fn main() {
    if let Err(err) = usecase_flow_layout::run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
