fn main() -> anyhow::Result<()> {
    barnes_hut::start()
}
