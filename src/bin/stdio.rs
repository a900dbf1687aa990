use std::sync::Arc;

use chat_app_demo::{
    logging,
    mcp::{session::LoggingObserver, stdio},
};
use tokio::io::{stdin, stdout, BufReader};
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init_logging();
    info!("stdio server starting");

    stdio::serve(BufReader::new(stdin()), stdout(), Arc::new(LoggingObserver))
        .await
        .inspect_err(|err| error!(error = %err, "stdio server failed"))?;
    Ok(())
}
