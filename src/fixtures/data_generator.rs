use std::collections::BTreeMap;
use std::fs;

use chrono::NaiveDate;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Deserialize;
use tracing::{info, warn};

use crate::domain::types::{Destination, Item, OrderLine, ShippingOrder, Vehicle};

const SEED: u64 = 12345;

/// Kanto destinations with real coordinates, spanning every region label.
const DESTINATIONS: &[(&str, &str, f64, f64)] = &[
    ("東京本社ビル", "東京都千代田区丸の内1-1-1", 35.6815, 139.7646),
    ("新宿支店", "東京都新宿区西新宿2-8-1", 35.6896, 139.6917),
    ("渋谷営業所", "東京都渋谷区渋谷3-15-3", 35.6598, 139.7036),
    ("品川物流センター", "東京都品川区東品川4-12-8", 35.6052, 139.7343),
    ("上野配送センター", "東京都台東区上野7-1-1", 35.7071, 139.7731),
    ("銀座店", "東京都中央区銀座4-6-16", 35.6719, 139.7653),
    ("立川営業所", "東京都立川市曙町2-4-4", 35.6977, 139.4138),
    ("八王子配送センター", "東京都八王子市旭町9-1", 35.6558, 139.3386),
    ("横浜みなとみらい支社", "神奈川県横浜市西区みなとみらい2-2-1", 35.4593, 139.6317),
    ("川崎工場", "神奈川県川崎市川崎区東田町8-1", 35.5308, 139.7029),
    ("厚木倉庫", "神奈川県厚木市中町3-17-17", 35.4409, 139.3661),
    ("大宮営業所", "埼玉県さいたま市大宮区桜木町1-7-5", 35.9069, 139.6224),
    ("川越配送センター", "埼玉県川越市脇田本町15-13", 35.9088, 139.4851),
    ("千葉支店", "千葉県千葉市中央区富士見2-3-1", 35.6069, 140.1233),
    ("船橋倉庫", "千葉県船橋市本町1-3-1", 35.6947, 139.9845),
];

/// Demo fleet, largest class first is not required; the loader re-sorts.
pub fn sample_fleet() -> Vec<Vehicle> {
    vec![
        Vehicle {
            id: 1,
            name: "小型トラック 2t".to_string(),
            floor_width: 200,
            floor_depth: 400,
            payload: 2000.0,
        },
        Vehicle {
            id: 2,
            name: "中型トラック 4t".to_string(),
            floor_width: 220,
            floor_depth: 450,
            payload: 4000.0,
        },
        Vehicle {
            id: 3,
            name: "大型トラック 6t".to_string(),
            floor_width: 240,
            floor_depth: 500,
            payload: 6000.0,
        },
    ]
}

pub fn sample_catalogue() -> BTreeMap<String, Item> {
    let items = vec![
        item("PC001", "ノートPC（13インチ）", 30, 21, 2, 1.3),
        item("PC002", "ノートPC（15インチ）", 35, 24, 3, 2.1),
        item("PC003", "デスクトップPC", 40, 35, 40, 8.0),
        item("PC004", "タブレット", 25, 17, 1, 0.5),
        item("PC005", "モニター（24インチ）", 54, 21, 32, 4.5),
        item("PC006", "モニター（27インチ）", 61, 23, 36, 6.2),
        item("PC007", "キーボード", 44, 13, 3, 0.8),
        item("PC009", "プリンター（インクジェット）", 45, 30, 15, 5.5),
        item("PC010", "プリンター（レーザー）", 40, 38, 26, 12.0),
    ];
    items
        .into_iter()
        .map(|i| (i.item_code.clone(), i))
        .collect()
}

fn item(code: &str, name: &str, w: u32, d: u32, h: u32, mass: f64) -> Item {
    Item {
        item_code: code.to_string(),
        name: name.to_string(),
        width: w,
        depth: d,
        height: h,
        mass,
    }
}

/// Deterministic demo orders spread over the destination list.
pub fn generate_orders(count: usize, deadline: NaiveDate) -> Vec<ShippingOrder> {
    let catalogue = sample_catalogue();
    let item_codes: Vec<&String> = catalogue.keys().collect();
    let mut rng = ChaCha8Rng::seed_from_u64(SEED);

    let mut orders = Vec::with_capacity(count);
    for id in 1..=count {
        let (name, address, lat, lon) = DESTINATIONS[rng.gen_range(0..DESTINATIONS.len())];

        let line_count = rng.gen_range(1..=3);
        let mut lines = Vec::with_capacity(line_count);
        for _ in 0..line_count {
            let code = item_codes[rng.gen_range(0..item_codes.len())];
            lines.push(OrderLine {
                item_code: code.clone(),
                quantity: rng.gen_range(1..=4),
            });
        }

        orders.push(ShippingOrder {
            id: id as i64,
            destination: Destination {
                name: name.to_string(),
                address: address.to_string(),
                latitude: Some(lat),
                longitude: Some(lon),
            },
            deadline,
            lines,
        });
    }

    info!("generated {} demo order(s) for {}", orders.len(), deadline);
    orders
}

/// Reads an item catalogue from a CSV file.
/// Accepts files with or without a header:
/// `item_code,name,width_cm,depth_cm,height_cm,mass_kg`.
pub fn read_catalogue_from_csv(
    csv_path: &str,
) -> Result<BTreeMap<String, Item>, Box<dyn std::error::Error>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .trim(csv::Trim::All)
        .from_path(csv_path)?;

    let mut catalogue = BTreeMap::new();
    for (idx, row) in reader.records().enumerate() {
        let record = row?;
        if record.len() < 6 {
            warn!("skipping short row {idx} in {csv_path}");
            continue;
        }

        // Treat a first row with a non-numeric width column as a header.
        if idx == 0 && record[2].parse::<u32>().is_err() {
            continue;
        }

        let entry = Item {
            item_code: record[0].to_string(),
            name: record[1].to_string(),
            width: record[2].parse()?,
            depth: record[3].parse()?,
            height: record[4].parse()?,
            mass: record[5].parse()?,
        };
        catalogue.insert(entry.item_code.clone(), entry);
    }

    Ok(catalogue)
}

#[derive(Debug, Deserialize)]
struct OrderRecord {
    id: i64,
    destination: DestinationRecord,
    deadline: String,
    lines: Vec<LineRecord>,
}

#[derive(Debug, Deserialize)]
struct DestinationRecord {
    name: String,
    address: String,
    latitude: Option<f64>,
    longitude: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct LineRecord {
    item_code: String,
    quantity: u32,
}

/// Reads shipping orders from a JSON file (an array of order records with
/// `YYYY-MM-DD` deadlines).
pub fn read_orders_from_json(
    json_path: &str,
) -> Result<Vec<ShippingOrder>, Box<dyn std::error::Error>> {
    let file_content = fs::read_to_string(json_path)?;
    let records: Vec<OrderRecord> = serde_json::from_str(&file_content)?;

    let mut orders = Vec::with_capacity(records.len());
    for record in records {
        orders.push(ShippingOrder {
            id: record.id,
            destination: Destination {
                name: record.destination.name,
                address: record.destination.address,
                latitude: record.destination.latitude,
                longitude: record.destination.longitude,
            },
            deadline: NaiveDate::parse_from_str(&record.deadline, "%Y-%m-%d")?,
            lines: record
                .lines
                .into_iter()
                .map(|l| OrderLine {
                    item_code: l.item_code,
                    quantity: l.quantity,
                })
                .collect(),
        });
    }

    Ok(orders)
}
