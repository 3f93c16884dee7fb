use std::error::Error;

fn main() -> Result<(), Box<dyn Error>> {
    sassign::cli::run_sassign(std::env::args().skip(1))
}
