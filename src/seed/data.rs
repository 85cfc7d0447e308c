use anyhow::Result;
use serde_json::json;

use crate::model::EntityDescriptor;
use crate::store::MemoryStore;

/// Entity types of the demo shop: users with addresses and orders,
/// orders with line items, addresses pointing at countries.
pub fn demo_descriptors() -> Vec<EntityDescriptor> {
    vec![
        EntityDescriptor::new("User")
            .with_attributes(&["name", "email"])
            .with_has_many("orders", "Order", "userId")
            .with_has_many("addresses", "Address", "userId"),
        EntityDescriptor::new("Order")
            .with_attributes(&["total", "status", "userId"])
            .with_has_many("line_items", "LineItem", "orderId")
            .with_belongs_to("User", "userId"),
        EntityDescriptor::new("LineItem")
            .with_attributes(&["sku", "quantity", "orderId"])
            .with_belongs_to("Order", "orderId"),
        EntityDescriptor::new("Address")
            .with_attributes(&["city", "zip", "userId", "countryId"])
            .with_belongs_to("User", "userId")
            .with_belongs_to("Country", "countryId"),
        EntityDescriptor::new("Country").with_attributes(&["name", "code"]),
    ]
}

/// Register the demo entity types and rows in `store`
pub fn load_seed_data(store: &MemoryStore) -> Result<()> {
    for descriptor in demo_descriptors() {
        store.register(descriptor);
    }

    let rows = [
        ("Country", json!({"id": 1, "name": "Sweden", "code": "SE"})),
        ("Country", json!({"id": 2, "name": "Norway", "code": "NO"})),
        ("User", json!({"id": 1, "name": "Ann", "email": "ann@example.com"})),
        ("User", json!({"id": 2, "name": "Bob", "email": "bob@example.com"})),
        ("User", json!({"id": 3, "name": "Cecilia", "email": "cecilia@example.com"})),
        ("Address", json!({"id": 1, "city": "Stockholm", "zip": "11122", "userId": 1, "countryId": 1})),
        ("Address", json!({"id": 2, "city": "Oslo", "zip": "0150", "userId": 1, "countryId": 2})),
        ("Address", json!({"id": 3, "city": "Uppsala", "zip": "75310", "userId": 2, "countryId": 1})),
        ("Order", json!({"id": 10, "total": 120.5, "status": "shipped", "userId": 1})),
        ("Order", json!({"id": 11, "total": 35.0, "status": "open", "userId": 2})),
        ("Order", json!({"id": 12, "total": 18.25, "status": "open", "userId": 1})),
        ("LineItem", json!({"id": 100, "sku": "BIKE-RED", "quantity": 1, "orderId": 10})),
        ("LineItem", json!({"id": 101, "sku": "HELMET-M", "quantity": 1, "orderId": 10})),
        ("LineItem", json!({"id": 102, "sku": "BELL", "quantity": 2, "orderId": 11})),
        ("LineItem", json!({"id": 103, "sku": "LIGHTS", "quantity": 1, "orderId": 12})),
    ];

    for (entity, values) in rows {
        store.insert(entity, values)?;
    }

    log::info!("Seeded demo data: {} users, {} orders", store.len("User"), store.len("Order"));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::{reduce, Reducible, SelectionParser};
    use crate::model::StoreFilter;
    use crate::store::EntityStore;

    #[tokio::test]
    async fn test_seed_graph_reduces_end_to_end() {
        let store = MemoryStore::new();
        load_seed_data(&store).unwrap();

        let descriptor = store.describe("User").await.unwrap();
        let ann = store
            .find_one("User", &StoreFilter::new().where_eq("id", json!(1)))
            .await
            .unwrap()
            .unwrap();
        let selection =
            SelectionParser::parse("name,addresses(city,country(code)),orders(status,lineItems(sku))")
                .unwrap();

        let shaped = reduce(&descriptor, Reducible::One(&ann), &selection, &store)
            .await
            .unwrap();

        assert_eq!(
            shaped,
            json!({
                "name": "Ann",
                "address": [
                    {"city": "Stockholm", "country": {"code": "SE"}},
                    {"city": "Oslo", "country": {"code": "NO"}}
                ],
                "order": [
                    {"status": "shipped", "lineItem": [{"sku": "BIKE-RED"}, {"sku": "HELMET-M"}]},
                    {"status": "open", "lineItem": [{"sku": "LIGHTS"}]}
                ]
            })
        );
    }
}
