//! Random-walk market feed for the paper mode.
//!
//! Emits one-minute bars (accelerated to one per second of wall time),
//! index and volatility ticks, and quotes with rough greeks for a small
//! synthetic option chain around the spot. This keeps the strategy loop
//! observable without a broker connection.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::sync::mpsc;

use common::{Bar, ContractId, GatewayEvent, OptionRight};

const SYMBOL: &str = "SPX";
const STRIKE_STEP: u32 = 5;
const CHAIN_HALF_WIDTH: u32 = 4;

pub struct SimFeed {
    event_tx: mpsc::UnboundedSender<GatewayEvent>,
    rng: StdRng,
    spot: f64,
    vix: f64,
    bar_time: DateTime<Utc>,
}

impl SimFeed {
    pub fn new(event_tx: mpsc::UnboundedSender<GatewayEvent>) -> Self {
        Self {
            event_tx,
            rng: StdRng::seed_from_u64(7),
            spot: 5900.0,
            vix: 16.0,
            bar_time: Utc::now(),
        }
    }

    pub async fn run(mut self) {
        let mut ticker = tokio::time::interval(std::time::Duration::from_secs(1));
        loop {
            ticker.tick().await;
            if self.step().is_err() {
                return; // engine gone
            }
        }
    }

    fn step(&mut self) -> Result<(), mpsc::error::SendError<GatewayEvent>> {
        let open = self.spot;
        // Occasional larger shock so z-score crossings actually happen
        let shock = if self.rng.gen_bool(0.05) { 6.0 } else { 1.5 };
        self.spot += self.rng.gen_range(-shock..shock);
        self.vix = (self.vix + self.rng.gen_range(-0.3..0.3)).clamp(10.0, 40.0);

        self.bar_time += ChronoDuration::minutes(1);
        let (high, low) = if open > self.spot {
            (open, self.spot)
        } else {
            (self.spot, open)
        };
        self.event_tx.send(GatewayEvent::Bar(Bar {
            timestamp: self.bar_time,
            open,
            high,
            low,
            close: self.spot,
        }))?;
        self.event_tx.send(GatewayEvent::IndexPrice(self.spot))?;
        self.event_tx.send(GatewayEvent::VolIndex(self.vix))?;

        self.emit_chain()?;
        Ok(())
    }

    /// Quotes and rough greeks for strikes around the spot. The deltas are
    /// a moneyness ramp, not a pricing model; they only need to give the
    /// selector something plausible to rank.
    fn emit_chain(&mut self) -> Result<(), mpsc::error::SendError<GatewayEvent>> {
        let expiry = self.bar_time.format("%Y%m%d").to_string();
        let atm = (self.spot / STRIKE_STEP as f64).round() as u32 * STRIKE_STEP;

        for i in 0..=(CHAIN_HALF_WIDTH * 2) {
            let strike = atm + (i * STRIKE_STEP) - CHAIN_HALF_WIDTH * STRIKE_STEP;
            let moneyness = (self.spot - strike as f64) / 40.0;
            let call_delta = (0.5 + moneyness).clamp(0.02, 0.98);
            let put_delta = call_delta - 1.0;

            for right in [OptionRight::Call, OptionRight::Put] {
                let contract = ContractId::new(SYMBOL, strike, right, expiry.clone());
                let intrinsic = match right {
                    OptionRight::Call => (self.spot - strike as f64).max(0.0),
                    OptionRight::Put => (strike as f64 - self.spot).max(0.0),
                };
                let mid = intrinsic + self.rng.gen_range(0.2..3.0);
                let spread = self.rng.gen_range(0.05..0.20);

                self.event_tx.send(GatewayEvent::QuoteTick {
                    contract: contract.clone(),
                    bid: Some((mid - spread).max(0.05)),
                    ask: Some(mid + spread),
                    last: Some(mid),
                    volume: Some(self.rng.gen_range(1.0..500.0)),
                })?;
                // Per-contract bar for the supertrend exit on straddle legs
                let wiggle = self.rng.gen_range(0.0..0.10);
                self.event_tx.send(GatewayEvent::ContractBar {
                    contract: contract.clone(),
                    bar: Bar {
                        timestamp: self.bar_time,
                        open: mid,
                        high: mid + wiggle,
                        low: (mid - wiggle).max(0.01),
                        close: mid,
                    },
                })?;
                self.event_tx.send(GatewayEvent::Greeks {
                    contract,
                    delta: match right {
                        OptionRight::Call => call_delta,
                        OptionRight::Put => put_delta,
                    },
                    gamma: 0.01,
                    theta: -0.8,
                    vega: 0.4,
                    iv: self.vix / 100.0,
                })?;
            }
        }
        Ok(())
    }
}
