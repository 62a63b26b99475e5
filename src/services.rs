use async_trait::async_trait;
use sqlx::PgPool;
use tokio::sync::mpsc;

use crate::settings::Settings;

mod http;
mod ledger;
mod wallet;

#[async_trait]
pub trait RequestHandler<T>: Send + Sync + 'static
where
    T: Send + 'static,
{
    async fn handle_request(&self, request: T);
}

#[async_trait]
pub trait Service<T, H>: Send + Sync + 'static
where
    T: Send + 'static,
    H: RequestHandler<T> + Clone + Send,
{
    async fn run(&mut self, handler: H, receiver: &mut mpsc::Receiver<T>) {
        while let Some(request) = receiver.recv().await {
            let handler = handler.clone();

            tokio::spawn(async move {
                handler.handle_request(request).await;
            });
        }
    }
}

pub async fn start_services(pool: PgPool, settings: Settings) -> Result<(), anyhow::Error> {
    let (ledger_tx, mut ledger_rx) = mpsc::channel(512);
    let (wallet_tx, mut wallet_rx) = mpsc::channel(512);

    let mut ledger_service = ledger::LedgerService::new();
    let mut wallet_service = wallet::WalletService::new();

    println!("[*] Starting ledger service.");
    let ledger_pool = pool.clone();
    let ledger_settings = settings.clone();
    tokio::spawn(async move {
        ledger_service
            .run(
                ledger::LedgerRequestHandler::new(ledger_pool, &ledger_settings),
                &mut ledger_rx,
            )
            .await;
    });

    println!("[*] Starting wallet service.");
    let wallet_pool = pool.clone();
    tokio::spawn(async move {
        wallet_service
            .run(
                wallet::WalletRequestHandler::new(wallet_pool),
                &mut wallet_rx,
            )
            .await;
    });

    println!("[*] Starting HTTP server.");
    http::start_http_server(ledger_tx, wallet_tx, &settings).await?;

    Ok(())
}
