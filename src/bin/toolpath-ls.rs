use std::thread;
use std::time::Duration;

use anyhow::Result;
use gcode_toolpath::config::Config;
use gcode_toolpath::lsp::server::serve;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_args_and_env()?;
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&config.log_level))
        .init();

    // Under the integration tests, exit after a short delay so the test can
    // read stdout to EOF
    if std::env::var("TOOLPATH_LS_TEST_EXIT").as_deref() == Ok("1") {
        thread::spawn(|| {
            thread::sleep(Duration::from_secs(2));
            std::process::exit(0);
        });
    }

    serve(config).await
}
