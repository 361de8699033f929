//! Prints what each notification and the status report look like, without
//! touching the network.

use stock_monitor::notify::render::operator_alert;
use stock_monitor::notify::Renderer;
use stock_monitor::status::render_report;
use stock_monitor::{ListingRecord, Snapshot, Tier, TransitionEvent, TransitionKind};

fn main() {
    tracing_subscriber::fmt().with_target(false).init();

    let mut record = ListingRecord::new("黄金区", "HK-Mini", Some(3)).with_tier(Tier::level(3));
    record.description_text = "1 vCPU\n1 GB RAM\n10 GB SSD".into();
    record.detail_url = "https://shop.example/cart?fid=1&gid=2".into();

    let renderer = Renderer::default();
    for (kind, stock, prev) in [
        (TransitionKind::Listed, 3, 0),
        (TransitionKind::StockChanged, 2, 3),
        (TransitionKind::SoldOut, 0, 2),
    ] {
        let mut r = record.clone();
        r.stock_count = Some(stock);
        let msg = renderer.render(&TransitionEvent {
            kind,
            record: r,
            previous_stock: prev,
        });
        println!("--- {kind:?} (expires: {:?})\n{}", msg.expire_after, msg.text);
    }

    println!("--- alert\n{}", operator_alert().text);

    let snap = Snapshot::from_records([record, ListingRecord::new("白银区", "JP-Basic", None)]);
    println!("--- status\n{}", render_report(&snap, &Default::default()));
}
