//! Default catalog contents.

use common::Money;
use record_store::RecordId;

use super::{Category, Product};

const CATEGORIES: [(&str, &str); 8] = [
    ("Протеины", "Белковые добавки для роста мышечной массы"),
    ("Аминокислоты", "BCAA, глютамин и другие аминокислоты"),
    ("Креатин", "Креатин моногидрат и другие формы креатина"),
    ("Витамины", "Витаминно-минеральные комплексы"),
    ("Гейнеры", "Углеводно-белковые смеси для набора массы"),
    ("Жиросжигатели", "Добавки для снижения веса"),
    ("Энергетики", "Предтренировочные комплексы и энергетики"),
    ("Батончики", "Протеиновые батончики и снеки"),
];

/// (name, description, price, category position, stock, emoji)
const PRODUCTS: [(&str, &str, i64, usize, u32, &str); 12] = [
    ("Whey Protein 2kg", "Сывороточный протеин высокого качества, 80% белка", 450_000, 0, 50, "🥛"),
    ("Casein Protein 1.8kg", "Казеиновый протеин медленного усвоения", 520_000, 0, 30, "🥛"),
    ("Isolate Protein 2kg", "Изолят сывороточного протеина, 90% белка", 650_000, 0, 25, "🥛"),
    ("BCAA 2:1:1 500g", "Комплекс незаменимых аминокислот", 280_000, 1, 60, "💊"),
    ("Glutamine 300g", "L-глютамин для восстановления", 180_000, 1, 40, "💊"),
    ("Creatine Monohydrate 500g", "Креатин моногидрат микронизированный", 150_000, 2, 80, "⚡"),
    ("Multivitamin Complex", "Комплекс витаминов и минералов, 90 капсул", 120_000, 3, 100, "🌟"),
    ("Mass Gainer 3kg", "Углеводно-белковая смесь для набора массы", 380_000, 4, 40, "📈"),
    ("L-Carnitine 500ml", "Л-карнитин жидкий для жиросжигания", 140_000, 5, 55, "🔥"),
    ("Pre-Workout Extreme", "Предтренировочный комплекс, 300g", 280_000, 6, 50, "⚡"),
    ("Protein Bar Chocolate", "Протеиновый батончик шоколад, 20g белка", 15_000, 7, 200, "🍫"),
    ("Protein Bar Vanilla", "Протеиновый батончик ваниль, 20g белка", 15_000, 7, 180, "🍦"),
];

/// The default categories, without ids.
pub fn default_categories() -> Vec<Category> {
    CATEGORIES
        .iter()
        .map(|(name, description)| Category::new(*name).with_description(*description))
        .collect()
}

/// The default products, filed under the given category ids.
///
/// `category_ids` must hold the ids assigned to [`default_categories`], in
/// the same order.
pub fn default_products(category_ids: &[RecordId]) -> Vec<Product> {
    PRODUCTS
        .iter()
        .filter_map(|(name, description, price, category, stock, emoji)| {
            let category_id = *category_ids.get(*category)?;
            Some(
                Product::new(*name, Money::new(*price), category_id, *stock)
                    .with_description(*description)
                    .with_emoji(*emoji),
            )
        })
        .collect()
}
