fn main() -> anyhow::Result<()> {
    rantbox::cli::run()
}
