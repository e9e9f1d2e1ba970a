use anyhow::Result;
use serde_json::json;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio::time::{interval, MissedTickBehavior};

use modelboard::chart::{ChartPanel, Debouncer};
use modelboard::chat::feed::format_time;
use modelboard::chat::translate::run_translations;
use modelboard::chat::{ChatCompletionClient, ConversationFeed, ModelFilter, TranslationBook, Translator};
use modelboard::command::Command;
use modelboard::config::Config;
use modelboard::feed::BoardApi;
use modelboard::logging::{
    log, log_fetch_error, log_merge, log_shutdown, log_startup, log_view_change, obj, ts_epoch_ms, v_str, Domain,
    Level,
};

enum Input {
    Line(String),
    ApplyResize(u32),
    Closed,
}

struct Board {
    cfg: Config,
    api: BoardApi,
    translator: Option<ChatCompletionClient>,
    panel: ChartPanel,
    feed: ConversationFeed,
    book: TranslationBook,
    filter: ModelFilter,
}

impl Board {
    async fn poll_series(&mut self) {
        match self.api.fetch_series().await {
            Ok(batch) => {
                if batch.skipped > 0 {
                    log(
                        Level::Warn,
                        Domain::Feed,
                        "skipped_points",
                        obj(&[("count", json!(batch.skipped))]),
                    );
                }
                let outcome = self.panel.on_batch(batch.points, &batch.model_ids);
                let agg = self.panel.aggregator();
                log_merge(&outcome, agg.len(), agg.models().len());
            }
            Err(err) => {
                self.panel.on_fetch_error();
                log_fetch_error(&self.cfg.endpoint("since-inception-values"), &err.to_string());
            }
        }
    }

    async fn poll_conversations(&mut self) {
        match self.api.fetch_conversations().await {
            Ok(feed) => {
                log(Level::Debug, Domain::Chat, "conversations", obj(&[("count", json!(feed.len()))]));
                self.feed = feed;
            }
            Err(err) => {
                log_fetch_error(&self.cfg.endpoint("conversations"), &err.to_string());
                return;
            }
        }
        if let Some(translator) = &self.translator {
            let list = self.feed.list(&self.filter);
            let jobs = self.book.pending_auto(&list, self.cfg.auto_translate);
            if !jobs.is_empty() {
                run_translations(translator as &dyn Translator, &mut self.book, jobs).await;
            }
        }
    }

    async fn toggle_translation(&mut self, key: &str) {
        if self.book.toggle(key) {
            return;
        }
        let Some(translator) = &self.translator else {
            eprintln!("translation disabled: set CHAT_API_TOKEN");
            return;
        };
        let content = self
            .feed
            .list(&ModelFilter::All)
            .into_iter()
            .find(|c| c.card_key() == key)
            .map(|c| c.summary.clone());
        match content {
            Some(text) if !text.is_empty() => {
                run_translations(translator as &dyn Translator, &mut self.book, vec![(key.to_string(), text)]).await;
            }
            _ => eprintln!("no card {} with content", key),
        }
    }

    fn render(&mut self) {
        for line in self.panel.frame(ts_epoch_ms()).summary_lines() {
            eprintln!("{}", line);
        }
        let cards = self.feed.list(&self.filter);
        for c in cards.iter().take(self.cfg.auto_translate.max(3)) {
            let key = c.card_key();
            let text = self.book.display(&key, &c.summary);
            let first = text.lines().next().unwrap_or_default();
            eprintln!("  [{}] {} {}: {}", key, format_time(c.timestamp), c.model_id, first);
        }
    }

    /// Returns false when the daemon should stop.
    async fn handle(&mut self, cmd: Command, resize: &mut Debouncer, tx: &mpsc::UnboundedSender<Input>) -> bool {
        match cmd {
            Command::Range(r) => {
                log_view_change("range", &r.label());
                self.panel.set_range(r);
            }
            Command::Mode(m) => {
                log_view_change("mode", m.symbol());
                self.panel.set_mode(m);
            }
            Command::Toggle(id) => {
                log_view_change("legend", &id);
                self.panel.toggle_model(&id);
            }
            Command::Resize(px) => {
                let tx = tx.clone();
                resize.schedule(move || {
                    let _ = tx.send(Input::ApplyResize(px));
                });
                return true;
            }
            Command::Filter(f) => {
                log_view_change("filter", &format!("{:?}", f));
                self.filter = f;
            }
            Command::Translate(key) => self.toggle_translation(&key).await,
            Command::Totals => match self.api.fetch_account_totals().await {
                Ok(v) => eprintln!("{}", serde_json::to_string_pretty(&v).unwrap_or_else(|_| v.to_string())),
                Err(err) => log_fetch_error(&self.cfg.endpoint("account-totals"), &err.to_string()),
            },
            Command::Frame => {
                let frame = self.panel.frame(ts_epoch_ms());
                println!("{}", serde_json::to_string(&frame).unwrap_or_default());
                return true;
            }
            Command::Quit => return false,
        }
        self.render();
        true
    }
}

fn spawn_stdin(tx: mpsc::UnboundedSender<Input>) {
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            if tx.send(Input::Line(line)).is_err() {
                return;
            }
        }
        let _ = tx.send(Input::Closed);
    });
}

#[tokio::main]
async fn main() -> Result<()> {
    let cfg = Config::from_env();
    let translator = match &cfg.chat_api_token {
        Some(token) => Some(ChatCompletionClient::new(
            &cfg.chat_api_base,
            token,
            &cfg.chat_model,
            cfg.http_timeout(),
        )?),
        None => None,
    };
    log_startup(&cfg.api_base, cfg.poll_secs, translator.is_some());

    let mut board = Board {
        api: BoardApi::new(cfg.clone())?,
        panel: ChartPanel::new(cfg.panel_settings()),
        filter: cfg.model_filter(),
        feed: ConversationFeed::default(),
        book: TranslationBook::new(),
        translator,
        cfg,
    };

    let (tx, mut rx) = mpsc::unbounded_channel();
    spawn_stdin(tx.clone());
    let mut resize = Debouncer::new(board.cfg.resize_debounce());
    let mut ticker = interval(board.cfg.poll_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut stdin_open = true;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                board.poll_series().await;
                board.poll_conversations().await;
                board.render();
            }
            Some(input) = rx.recv(), if stdin_open => match input {
                Input::Line(line) if line.trim().is_empty() => {}
                Input::Line(line) => match Command::parse(&line, &board.cfg) {
                    Ok(cmd) => {
                        if !board.handle(cmd, &mut resize, &tx).await {
                            break;
                        }
                    }
                    Err(err) => eprintln!("{}", err),
                },
                Input::ApplyResize(px) => {
                    log_view_change("viewport", &px.to_string());
                    board.panel.resize(px);
                    board.render();
                }
                Input::Closed => stdin_open = false,
            },
            _ = tokio::signal::ctrl_c() => {
                log(Level::Info, Domain::System, "signal", obj(&[("msg", v_str("ctrl_c"))]));
                break;
            }
        }
    }

    resize.cancel();
    let (rows, models) = (board.panel.aggregator().len(), board.panel.models().len());
    board.panel.dispose();
    log_shutdown(rows, models);
    Ok(())
}
