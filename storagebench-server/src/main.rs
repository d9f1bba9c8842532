use anyhow::Result;

fn main() -> Result<()> {
    storagebench_server::cli::execute()
}
