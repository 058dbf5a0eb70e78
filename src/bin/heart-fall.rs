fn main() -> anyhow::Result<()> {
    heart_fall::run()
}
