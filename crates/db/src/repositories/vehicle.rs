use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use sqlx::{QueryBuilder, Row, Sqlite};

use carlot_core::domain::filters::FilterSet;
use carlot_core::domain::vehicle::Vehicle;

use super::{InventoryRepository, RepositoryError};
use crate::DbPool;

const VEHICLE_COLUMNS: &str = "SELECT marca, modelo, ano, cor, preco_centavos, kilometragem, \
     novo, doc_ok, batida, chassi, combustivel, portas, cambio FROM vehicles";

pub struct SqlInventoryRepository {
    pool: DbPool,
}

impl SqlInventoryRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn price_to_centavos(price: Decimal) -> Result<i64, RepositoryError> {
    centavos(price, RoundingStrategy::MidpointNearestEven)
}

/// Filter bounds round inward (minimum up, maximum down) so stored whole
/// centavo prices compare exactly as they would against the decimal bound.
fn centavos(price: Decimal, strategy: RoundingStrategy) -> Result<i64, RepositoryError> {
    (price.round_dp_with_strategy(2, strategy) * Decimal::ONE_HUNDRED)
        .to_i64()
        .ok_or_else(|| RepositoryError::Decode(format!("price `{price}` is out of range")))
}

fn centavos_to_price(centavos: i64) -> Decimal {
    Decimal::new(centavos, 2)
}

/// Lowercased `%term%` pattern with LIKE wildcards escaped.
fn like_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for ch in term.trim().to_ascii_lowercase().chars() {
        if matches!(ch, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('%');
    pattern
}

fn decode<'r, T>(row: &'r sqlx::sqlite::SqliteRow, column: &str) -> Result<T, RepositoryError>
where
    T: sqlx::Decode<'r, Sqlite> + sqlx::Type<Sqlite>,
{
    row.try_get(column).map_err(|e| RepositoryError::Decode(e.to_string()))
}

fn row_to_vehicle(row: &sqlx::sqlite::SqliteRow) -> Result<Vehicle, RepositoryError> {
    let year: i64 = decode(row, "ano")?;
    let mileage: i64 = decode(row, "kilometragem")?;
    let doors: i64 = decode(row, "portas")?;

    Ok(Vehicle {
        brand: decode(row, "marca")?,
        model: decode(row, "modelo")?,
        year: i32::try_from(year)
            .map_err(|_| RepositoryError::Decode(format!("year `{year}` is out of range")))?,
        color: decode(row, "cor")?,
        price: centavos_to_price(decode(row, "preco_centavos")?),
        mileage: u64::try_from(mileage)
            .map_err(|_| RepositoryError::Decode(format!("mileage `{mileage}` is negative")))?,
        is_new: decode(row, "novo")?,
        doc_ok: decode(row, "doc_ok")?,
        crashed: decode(row, "batida")?,
        chassis: decode(row, "chassi")?,
        fuel_type: decode(row, "combustivel")?,
        doors: u32::try_from(doors)
            .map_err(|_| RepositoryError::Decode(format!("doors `{doors}` is out of range")))?,
        transmission: decode(row, "cambio")?,
    })
}

fn push_text_filter(
    builder: &mut QueryBuilder<'_, Sqlite>,
    column: &str,
    value: &Option<String>,
) {
    if let Some(term) = value.as_deref().filter(|term| !term.trim().is_empty()) {
        builder.push(format!(" AND LOWER({column}) LIKE "));
        builder.push_bind(like_pattern(term));
        builder.push(" ESCAPE '\\'");
    }
}

fn build_filtered_query(
    filters: &FilterSet,
) -> Result<QueryBuilder<'static, Sqlite>, RepositoryError> {
    let mut builder = QueryBuilder::new(VEHICLE_COLUMNS);
    builder.push(" WHERE 1=1");

    push_text_filter(&mut builder, "marca", &filters.brand);
    push_text_filter(&mut builder, "modelo", &filters.model);
    if let Some(year_min) = filters.year_min {
        builder.push(" AND ano >= ").push_bind(year_min);
    }
    if let Some(year_max) = filters.year_max {
        builder.push(" AND ano <= ").push_bind(year_max);
    }
    if let Some(price_min) = filters.price_min {
        let bound = centavos(price_min, RoundingStrategy::ToPositiveInfinity)?;
        builder.push(" AND preco_centavos >= ").push_bind(bound);
    }
    if let Some(price_max) = filters.price_max {
        let bound = centavos(price_max, RoundingStrategy::ToNegativeInfinity)?;
        builder.push(" AND preco_centavos <= ").push_bind(bound);
    }
    push_text_filter(&mut builder, "combustivel", &filters.fuel_type);
    push_text_filter(&mut builder, "cor", &filters.color);
    push_text_filter(&mut builder, "cambio", &filters.transmission);
    if let Some(doors) = filters.door_count {
        builder.push(" AND portas = ").push_bind(i64::from(doors));
    }
    if let Some(max_mileage) = filters.max_mileage {
        builder.push(" AND kilometragem <= ").push_bind(i64::from(max_mileage));
    }
    if filters.new_only == Some(true) {
        builder.push(" AND novo = 1");
    }

    builder.push(" ORDER BY id ASC");
    Ok(builder)
}

#[async_trait::async_trait]
impl InventoryRepository for SqlInventoryRepository {
    async fn all(&self) -> Result<Vec<Vehicle>, RepositoryError> {
        let sql = format!("{VEHICLE_COLUMNS} ORDER BY id ASC");
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;

        rows.iter().map(row_to_vehicle).collect::<Result<Vec<_>, _>>()
    }

    async fn filtered(&self, filters: &FilterSet) -> Result<Vec<Vehicle>, RepositoryError> {
        let mut builder = build_filtered_query(filters)?;
        let rows = builder.build().fetch_all(&self.pool).await?;

        rows.iter().map(row_to_vehicle).collect::<Result<Vec<_>, _>>()
    }

    async fn brands(&self) -> Result<Vec<String>, RepositoryError> {
        let brands: Vec<String> =
            sqlx::query_scalar("SELECT DISTINCT marca FROM vehicles ORDER BY marca ASC")
                .fetch_all(&self.pool)
                .await?;
        Ok(brands)
    }

    async fn insert(&self, vehicle: Vehicle) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            "INSERT INTO vehicles (marca, modelo, ano, cor, preco_centavos, kilometragem, novo,
                                   doc_ok, batida, chassi, combustivel, portas, cambio)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(chassi) DO NOTHING",
        )
        .bind(&vehicle.brand)
        .bind(&vehicle.model)
        .bind(vehicle.year)
        .bind(&vehicle.color)
        .bind(price_to_centavos(vehicle.price)?)
        .bind(i64::try_from(vehicle.mileage).map_err(|_| {
            RepositoryError::Decode(format!("mileage `{}` is out of range", vehicle.mileage))
        })?)
        .bind(vehicle.is_new)
        .bind(vehicle.doc_ok)
        .bind(vehicle.crashed)
        .bind(&vehicle.chassis)
        .bind(&vehicle.fuel_type)
        .bind(i64::from(vehicle.doors))
        .bind(&vehicle.transmission)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn count(&self) -> Result<u64, RepositoryError> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM vehicles").fetch_one(&self.pool).await?;
        u64::try_from(count).map_err(|_| RepositoryError::Decode(format!("negative count {count}")))
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use carlot_core::domain::filters::FilterSet;

    use super::{like_pattern, price_to_centavos, SqlInventoryRepository};
    use crate::fixtures::demo_vehicles;
    use crate::repositories::{InMemoryInventoryRepository, InventoryRepository};
    use crate::{connect_with_settings, migrations};

    async fn seeded_repository() -> SqlInventoryRepository {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        let repository = SqlInventoryRepository::new(pool);
        for vehicle in demo_vehicles() {
            repository.insert(vehicle).await.expect("insert vehicle");
        }
        repository
    }

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern(" Toyota "), "%toyota%");
        assert_eq!(like_pattern("100%_"), "%100\\%\\_%");
    }

    #[test]
    fn prices_round_to_centavos() {
        assert_eq!(price_to_centavos(Decimal::new(8_500_000, 2)).expect("convert"), 8_500_000);
        assert_eq!(price_to_centavos(Decimal::new(12_345, 3)).expect("convert"), 1_234);
    }

    #[tokio::test]
    async fn all_returns_every_vehicle_in_insertion_order() {
        let repository = seeded_repository().await;
        let vehicles = repository.all().await.expect("all");
        let expected = demo_vehicles();

        assert_eq!(vehicles.len(), expected.len());
        assert_eq!(vehicles[0], expected[0]);
        assert_eq!(vehicles.last(), expected.last());
    }

    #[tokio::test]
    async fn brand_filter_is_case_insensitive_substring() {
        let repository = seeded_repository().await;
        let filters = FilterSet { brand: Some("toyo".to_string()), ..FilterSet::default() };

        let vehicles = repository.filtered(&filters).await.expect("filtered");
        assert!(!vehicles.is_empty());
        assert!(vehicles.iter().all(|vehicle| vehicle.brand == "Toyota"));
    }

    #[tokio::test]
    async fn range_filters_are_inclusive() {
        let repository = seeded_repository().await;
        let all = repository.all().await.expect("all");
        let target = &all[0];

        let filters = FilterSet {
            year_min: Some(target.year),
            year_max: Some(target.year),
            price_min: Some(target.price),
            price_max: Some(target.price),
            max_mileage: u32::try_from(target.mileage).ok(),
            ..FilterSet::default()
        };
        let vehicles = repository.filtered(&filters).await.expect("filtered");
        assert!(vehicles.contains(target));
        assert!(vehicles.iter().all(|vehicle| vehicle.year == target.year));
    }

    #[tokio::test]
    async fn sub_centavo_price_bounds_match_in_memory_store() {
        let repository = seeded_repository().await;
        let memory = InMemoryInventoryRepository::with_vehicles(demo_vehicles());
        let target = repository.all().await.expect("all").remove(0);
        let just_under = target.price - Decimal::new(4, 3);
        let just_over = target.price + Decimal::new(4, 3);

        for filters in [
            FilterSet { price_max: Some(just_under), ..FilterSet::default() },
            FilterSet { price_min: Some(just_over), ..FilterSet::default() },
            FilterSet {
                price_min: Some(just_under),
                price_max: Some(just_over),
                ..FilterSet::default()
            },
        ] {
            let sql = repository.filtered(&filters).await.expect("sql filtered");
            let expected = memory.filtered(&filters).await.expect("memory filtered");
            assert_eq!(sql, expected, "filters: {filters:?}");
        }

        let below = FilterSet { price_max: Some(just_under), ..FilterSet::default() };
        let vehicles = repository.filtered(&below).await.expect("filtered");
        assert!(!vehicles.contains(&target));
    }

    #[tokio::test]
    async fn new_only_and_doors_restrict_results() {
        let repository = seeded_repository().await;
        let filters =
            FilterSet { new_only: Some(true), door_count: Some(4), ..FilterSet::default() };

        let vehicles = repository.filtered(&filters).await.expect("filtered");
        assert!(!vehicles.is_empty());
        assert!(vehicles.iter().all(|vehicle| vehicle.is_new && vehicle.doors == 4));
    }

    #[tokio::test]
    async fn empty_filter_set_matches_everything() {
        let repository = seeded_repository().await;
        let filtered = repository.filtered(&FilterSet::default()).await.expect("filtered");
        let all = repository.all().await.expect("all");
        assert_eq!(filtered, all);
    }

    #[tokio::test]
    async fn brands_are_distinct_and_sorted() {
        let repository = seeded_repository().await;
        let brands = repository.brands().await.expect("brands");

        let mut expected = brands.clone();
        expected.sort();
        expected.dedup();
        assert_eq!(brands, expected);
        assert!(brands.contains(&"Honda".to_string()));
    }

    #[tokio::test]
    async fn duplicate_chassis_is_not_inserted_twice() {
        let repository = seeded_repository().await;
        let before = repository.count().await.expect("count");

        let inserted =
            repository.insert(demo_vehicles().remove(0)).await.expect("insert duplicate");
        assert!(!inserted);
        assert_eq!(repository.count().await.expect("count"), before);
    }
}
