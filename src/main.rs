use flow_gallery::{
    config::{CONFIG_FILE, Config},
    flow,
};

fn main() -> anyhow::Result<()> {
    let config = Config::load_or_default(CONFIG_FILE)?;
    flow::run(config)
}
