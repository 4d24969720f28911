// =============================================================================
// In-memory BrokerClient test double, driving the integration scenarios
// under tests/ without any network access (SPEC_FULL §A.5).
// =============================================================================

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};

use aurora_momentum::broker::types::{
    Account, Bar, BrokerPosition, Clock, OrderRequest, OrderSide, OrderStatus, OrderStatusReport,
    Quote, Timeframe,
};
use aurora_momentum::broker::BrokerClient;
use aurora_momentum::state::StateDir;

/// The terminal outcome a queued order should resolve to on its first
/// `get_order` poll — every scenario here fills (or rejects) within one
/// poll, so `run_order_lifecycle`'s retry loop never actually has to sleep.
#[derive(Debug, Clone)]
pub struct FillPlan {
    pub status: OrderStatus,
    pub filled_qty: f64,
    pub filled_avg_price: Option<f64>,
}

impl FillPlan {
    pub fn filled(qty: f64, price: f64) -> Self {
        Self {
            status: OrderStatus::Filled,
            filled_qty: qty,
            filled_avg_price: Some(price),
        }
    }
}

struct Inner {
    clock: Clock,
    account: Account,
    positions: HashMap<String, BrokerPosition>,
    quotes: HashMap<String, Quote>,
    bars: HashMap<(String, &'static str), Vec<Bar>>,
    pending_fills: HashMap<String, VecDeque<FillPlan>>,
    orders: HashMap<String, (OrderRequest, FillPlan)>,
    next_order_id: u64,
    submitted: Vec<OrderRequest>,
    cancelled: Vec<String>,
}

pub struct MockBroker {
    inner: Mutex<Inner>,
}

impl MockBroker {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                clock: open_clock(),
                account: Account { equity: 100_000.0, cash: 100_000.0 },
                positions: HashMap::new(),
                quotes: HashMap::new(),
                bars: HashMap::new(),
                pending_fills: HashMap::new(),
                orders: HashMap::new(),
                next_order_id: 1,
                submitted: Vec::new(),
                cancelled: Vec::new(),
            }),
        }
    }

    pub fn set_clock(&self, clock: Clock) {
        self.inner.lock().unwrap().clock = clock;
    }

    pub fn set_account_equity(&self, equity: f64) {
        let mut inner = self.inner.lock().unwrap();
        inner.account.equity = equity;
        inner.account.cash = equity;
    }

    pub fn set_broker_position(&self, symbol: &str, qty: f64, avg_entry_price: f64) {
        self.inner.lock().unwrap().positions.insert(
            symbol.to_string(),
            BrokerPosition { symbol: symbol.to_string(), qty, avg_entry_price },
        );
    }

    pub fn set_quote(&self, symbol: &str, bid: f64, ask: f64) {
        self.inner.lock().unwrap().quotes.insert(symbol.to_string(), Quote { bid, ask });
    }

    pub fn set_bars(&self, symbol: &str, timeframe: Timeframe, bars: Vec<Bar>) {
        self.inner
            .lock()
            .unwrap()
            .bars
            .insert((symbol.to_string(), timeframe.as_alpaca_str()), bars);
    }

    /// Queue the outcome the *next* order submitted for `symbol` resolves
    /// to. Calls for the same symbol drain in FIFO order, so a
    /// buy-then-sell scenario can queue both fills up front.
    pub fn queue_fill(&self, symbol: &str, plan: FillPlan) {
        self.inner
            .lock()
            .unwrap()
            .pending_fills
            .entry(symbol.to_string())
            .or_default()
            .push_back(plan);
    }

    pub fn submitted_orders(&self) -> Vec<OrderRequest> {
        self.inner.lock().unwrap().submitted.clone()
    }

    pub fn cancelled_orders(&self) -> Vec<String> {
        self.inner.lock().unwrap().cancelled.clone()
    }

    pub fn broker_position_qty(&self, symbol: &str) -> f64 {
        self.inner.lock().unwrap().positions.get(symbol).map(|p| p.qty).unwrap_or(0.0)
    }
}

impl Default for MockBroker {
    fn default() -> Self {
        Self::new()
    }
}

fn apply_fill(inner: &mut Inner, order: &OrderRequest, plan: &FillPlan) {
    if plan.status != OrderStatus::Filled || plan.filled_qty <= 0.0 {
        return;
    }
    let price = plan.filled_avg_price.unwrap_or(0.0);
    let entry = inner.positions.entry(order.symbol.clone()).or_insert(BrokerPosition {
        symbol: order.symbol.clone(),
        qty: 0.0,
        avg_entry_price: price,
    });
    match order.side {
        OrderSide::Buy => {
            entry.qty += plan.filled_qty;
            entry.avg_entry_price = price;
        }
        OrderSide::Sell => {
            entry.qty -= plan.filled_qty;
            if entry.qty <= 0.0 {
                inner.positions.remove(&order.symbol);
            }
        }
    }
}

#[async_trait]
impl BrokerClient for MockBroker {
    async fn get_clock(&self) -> anyhow::Result<Clock> {
        Ok(self.inner.lock().unwrap().clock.clone())
    }

    async fn get_account(&self) -> anyhow::Result<Account> {
        Ok(self.inner.lock().unwrap().account.clone())
    }

    async fn list_positions(&self) -> anyhow::Result<Vec<BrokerPosition>> {
        Ok(self.inner.lock().unwrap().positions.values().cloned().collect())
    }

    async fn get_latest_quote(&self, symbol: &str) -> anyhow::Result<Quote> {
        self.inner
            .lock()
            .unwrap()
            .quotes
            .get(symbol)
            .copied()
            .ok_or_else(|| anyhow::anyhow!("no quote configured for {symbol}"))
    }

    async fn get_bars(&self, symbol: &str, timeframe: Timeframe, _limit: u32) -> anyhow::Result<Vec<Bar>> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .bars
            .get(&(symbol.to_string(), timeframe.as_alpaca_str()))
            .cloned()
            .unwrap_or_default())
    }

    async fn submit_order(&self, order: OrderRequest) -> anyhow::Result<String> {
        let mut inner = self.inner.lock().unwrap();
        let order_id = format!("mock-order-{}", inner.next_order_id);
        inner.next_order_id += 1;

        let plan = inner
            .pending_fills
            .get_mut(&order.symbol)
            .and_then(|q| q.pop_front())
            .unwrap_or_else(|| FillPlan::filled(order.qty as f64, order.limit_price.unwrap_or(0.0)));

        apply_fill(&mut inner, &order, &plan);
        inner.submitted.push(order.clone());
        inner.orders.insert(order_id.clone(), (order, plan));
        Ok(order_id)
    }

    async fn get_order(&self, order_id: &str) -> anyhow::Result<OrderStatusReport> {
        let inner = self.inner.lock().unwrap();
        let (_, plan) = inner
            .orders
            .get(order_id)
            .ok_or_else(|| anyhow::anyhow!("unknown order id {order_id}"))?;
        Ok(OrderStatusReport {
            order_id: order_id.to_string(),
            status: plan.status,
            filled_qty: plan.filled_qty,
            filled_avg_price: plan.filled_avg_price,
        })
    }

    async fn cancel_order(&self, order_id: &str) -> anyhow::Result<()> {
        self.inner.lock().unwrap().cancelled.push(order_id.to_string());
        Ok(())
    }
}

pub fn open_clock() -> Clock {
    let now = Utc::now();
    Clock {
        is_open: true,
        next_open: now + ChronoDuration::hours(16),
        next_close: now + ChronoDuration::hours(4),
    }
}

pub fn clock_minutes_to_close(minutes: i64) -> Clock {
    let now = Utc::now();
    Clock {
        is_open: true,
        next_open: now + ChronoDuration::hours(16),
        next_close: now + ChronoDuration::minutes(minutes),
    }
}

pub fn bar(t: DateTime<Utc>, o: f64, h: f64, l: f64, c: f64, v: f64) -> Bar {
    Bar { t, o, h, l, c, v }
}

/// `n` one-minute bars ending now, with closes following `pct_changes`
/// applied in order starting from `start_close`.
pub fn minute_bars_from_pct_changes(start_close: f64, pct_changes: &[f64]) -> Vec<Bar> {
    let mut closes = vec![start_close];
    for pct in pct_changes {
        let prev = *closes.last().unwrap();
        closes.push(prev * (1.0 + pct));
    }
    let now = Utc::now();
    let n = closes.len();
    closes
        .into_iter()
        .enumerate()
        .map(|(i, c)| bar(now - ChronoDuration::minutes((n - i) as i64), c, c, c, c, 10_000.0))
        .collect()
}

pub fn scratch_state_dir(prefix: &str) -> StateDir {
    let root = std::env::temp_dir().join(format!("aurora-{prefix}-test-{}", uuid::Uuid::new_v4()));
    std::fs::create_dir_all(&root).unwrap();
    StateDir::new(root, std::time::Duration::from_secs(5))
}
