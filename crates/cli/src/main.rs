fn main() -> Result<(), Box<dyn std::error::Error>> {
    mapscope_cli::run()
}
