fn main() -> anyhow::Result<()> {
    lendscope_lib::run()
}
