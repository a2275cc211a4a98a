//! Writes `sample_sales.csv` and `sample_sales.xlsx`: a small order table
//! with duplicate rows and missing numbers, for trying out the cleaning tools.

use anyhow::{Context, Result};
use rust_xlsxwriter::{Format, Workbook};

const HEADERS: [&str; 6] = ["order_id", "region", "product", "quantity", "unit_price", "returned"];

#[derive(Clone, Copy)]
struct Order {
    id: i64,
    region: &'static str,
    product: &'static str,
    quantity: Option<i64>,
    unit_price: Option<f64>,
    returned: bool,
}

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    fn chance(&mut self, p: f64) -> bool {
        self.next_f64() < p
    }

    fn pick<T: Copy>(&mut self, items: &[T]) -> T {
        items[(self.next_u64() % items.len() as u64) as usize]
    }
}

fn generate_orders(rng: &mut SimpleRng, count: i64) -> Vec<Order> {
    let regions = ["North", "South", "East", "West"];
    let products: [(&str, f64); 4] = [("Widget", 2.5), ("Gadget", 12.0), ("Gizmo", 7.25), ("Doohickey", 0.99)];

    let mut orders = Vec::new();
    for id in 1..=count {
        let (product, base_price) = rng.pick(&products);
        let order = Order {
            id,
            region: rng.pick(&regions),
            product,
            quantity: (!rng.chance(0.1)).then(|| 1 + (rng.next_u64() % 20) as i64),
            unit_price: (!rng.chance(0.1))
                .then(|| ((base_price * (0.9 + 0.2 * rng.next_f64())) * 100.0).round() / 100.0),
            returned: rng.chance(0.05),
        };
        orders.push(order);
        // Every so often the same order is recorded twice.
        if rng.chance(0.08) {
            orders.push(order);
        }
    }
    orders
}

fn write_csv(path: &str, orders: &[Order]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path).with_context(|| format!("creating {path}"))?;
    writer.write_record(HEADERS)?;
    for o in orders {
        writer.write_record([
            o.id.to_string(),
            o.region.to_string(),
            o.product.to_string(),
            o.quantity.map(|q| q.to_string()).unwrap_or_default(),
            o.unit_price.map(|p| p.to_string()).unwrap_or_default(),
            if o.returned { "True" } else { "False" }.to_string(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

fn write_xlsx(path: &str, orders: &[Order]) -> Result<()> {
    let mut workbook = Workbook::new();
    let bold = Format::new().set_bold();
    let sheet = workbook.add_worksheet();
    for (col, header) in HEADERS.iter().enumerate() {
        sheet.write_string_with_format(0, col as u16, *header, &bold)?;
    }
    for (i, o) in orders.iter().enumerate() {
        let row = i as u32 + 1;
        sheet.write_number(row, 0, o.id as f64)?;
        sheet.write_string(row, 1, o.region)?;
        sheet.write_string(row, 2, o.product)?;
        if let Some(q) = o.quantity {
            sheet.write_number(row, 3, q as f64)?;
        }
        if let Some(p) = o.unit_price {
            sheet.write_number(row, 4, p)?;
        }
        sheet.write_boolean(row, 5, o.returned)?;
    }
    workbook.save(path).with_context(|| format!("writing {path}"))?;
    Ok(())
}

fn main() -> Result<()> {
    let mut rng = SimpleRng::new(42);
    let orders = generate_orders(&mut rng, 200);

    write_csv("sample_sales.csv", &orders)?;
    write_xlsx("sample_sales.xlsx", &orders)?;

    println!(
        "Wrote {} rows ({} columns) to sample_sales.csv and sample_sales.xlsx",
        orders.len(),
        HEADERS.len()
    );
    Ok(())
}
