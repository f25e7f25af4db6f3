use std::collections::HashSet;

use chrono::{Duration, Utc};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use uuid::Uuid;

use models::coupon::CouponType;
use service::pricing::{cart_total, CouponTerms, Line};

fn bench_cart_total(c: &mut Criterion) {
    let lines: Vec<Line> = (0..200)
        .map(|i| Line { product_id: Uuid::new_v4(), unit_price: 100 + i, quantity: (i % 5 + 1) as i32 })
        .collect();
    let mapped: HashSet<Uuid> = lines.iter().step_by(2).map(|l| l.product_id).collect();
    let now = Utc::now();
    let coupon = CouponTerms {
        coupon_type: CouponType::Percentage,
        value: 15,
        max_value: Some(250),
        start_at: now - Duration::days(1),
        expire_at: now + Duration::days(1),
        product_ids: mapped,
    };

    c.bench_function("cart_total_200_lines", |b| {
        b.iter(|| cart_total(black_box(&lines), Some(&coupon), now));
    });
}

criterion_group!(benches, bench_cart_total);
criterion_main!(benches);
