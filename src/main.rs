fn main() -> anyhow::Result<()> {
    event_hunter_lib::run()
}
