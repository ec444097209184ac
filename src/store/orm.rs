use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::Expr;
use sea_orm::sea_query::extension::postgres::PgExpr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, SqlErr, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    audit::{AuditEntry, log_audit},
    db::{DbPool, OrmConn, create_pool, orm_from_pool},
    entity::{
        bookings::{
            ActiveModel as BookingActive, Column as BookingCol, Entity as Bookings,
            Model as BookingModel,
        },
        customers::{
            ActiveModel as CustomerActive, Column as CustomerCol, Entity as Customers,
            Model as CustomerModel,
        },
        services::{
            ActiveModel as ServiceActive, Column as ServiceCol, Entity as Services,
            Model as ServiceModel,
        },
    },
    error::{AppError, AppResult, Conflict},
    models::{
        AppointmentType, Booking, BookingStatus, Customer, PaymentMethod, PaymentStatus, Service,
        ServiceCategory,
    },
};

use super::{
    BookingFilter, BookingOrder, CustomerChanges, CustomerFilter, CustomerOrder, NewBooking,
    NewCustomer, NewService, Page, ServiceChanges, Store,
};

/// Postgres-backed store. SeaORM and the raw sqlx pool share one connection pool.
#[derive(Clone)]
pub struct OrmStore {
    pool: DbPool,
    orm: OrmConn,
}

impl OrmStore {
    pub fn new(pool: DbPool) -> Self {
        let orm = orm_from_pool(&pool);
        Self { pool, orm }
    }

    pub async fn connect(database_url: &str) -> anyhow::Result<Self> {
        let pool = create_pool(database_url).await?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    pub fn orm(&self) -> &OrmConn {
        &self.orm
    }
}

#[async_trait]
impl Store for OrmStore {
    async fn find_customer(&self, id: Uuid) -> AppResult<Option<Customer>> {
        let customer = Customers::find_by_id(id).one(&self.orm).await?;
        Ok(customer.map(customer_from_entity))
    }

    async fn find_customer_by_email(&self, email: &str) -> AppResult<Option<Customer>> {
        let customer = Customers::find()
            .filter(CustomerCol::Email.eq(email.trim().to_lowercase()))
            .one(&self.orm)
            .await?;
        Ok(customer.map(customer_from_entity))
    }

    async fn create_customer(&self, customer: NewCustomer) -> AppResult<Customer> {
        let created = CustomerActive {
            id: Set(Uuid::new_v4()),
            name: Set(customer.name),
            email: Set(customer.email.trim().to_lowercase()),
            phone: Set(customer.phone),
            address: Set(customer.address),
            loyalty_points: Set(0),
            total_spent: Set(Decimal::ZERO),
            created_at: NotSet,
            updated_at: NotSet,
        }
        .insert(&self.orm)
        .await
        .map_err(map_db_err)?;

        Ok(customer_from_entity(created))
    }

    async fn update_customer(&self, id: Uuid, changes: CustomerChanges) -> AppResult<Customer> {
        let existing = Customers::find_by_id(id).one(&self.orm).await?;
        let existing = match existing {
            Some(c) => c,
            None => return Err(AppError::NotFound("Customer")),
        };

        let mut active: CustomerActive = existing.into();
        if let Some(name) = changes.name {
            active.name = Set(name);
        }
        if let Some(phone) = changes.phone {
            active.phone = Set(Some(phone));
        }
        if let Some(address) = changes.address {
            active.address = Set(Some(address));
        }
        active.updated_at = Set(Utc::now().into());

        let customer = active.update(&self.orm).await?;
        Ok(customer_from_entity(customer))
    }

    async fn list_customers(
        &self,
        filter: &CustomerFilter,
        page: Page,
        order: CustomerOrder,
    ) -> AppResult<(Vec<Customer>, u64)> {
        let mut condition = Condition::all();
        if let Some(search) = filter.search.as_ref().filter(|s| !s.is_empty()) {
            let pattern = contains_pattern(search);
            condition = condition.add(
                Condition::any()
                    .add(Expr::col(CustomerCol::Name).ilike(pattern.clone()))
                    .add(Expr::col(CustomerCol::Email).ilike(pattern.clone()))
                    .add(Expr::col(CustomerCol::Phone).ilike(pattern)),
            );
        }

        let mut finder = Customers::find().filter(condition);
        finder = match order {
            CustomerOrder::TotalSpentDesc => finder
                .order_by_desc(CustomerCol::TotalSpent)
                .order_by_asc(CustomerCol::Name),
            CustomerOrder::NameAsc => finder.order_by_asc(CustomerCol::Name),
        };

        let total = finder.clone().count(&self.orm).await?;

        let customers = finder
            .limit(page.limit)
            .offset(page.offset)
            .all(&self.orm)
            .await?
            .into_iter()
            .map(customer_from_entity)
            .collect();

        Ok((customers, total))
    }

    async fn find_service(&self, id: Uuid) -> AppResult<Option<Service>> {
        Services::find_by_id(id)
            .one(&self.orm)
            .await?
            .map(service_from_entity)
            .transpose()
    }

    async fn find_service_by_name(&self, name: &str) -> AppResult<Option<Service>> {
        Services::find()
            .filter(
                Condition::all()
                    .add(ServiceCol::Name.eq(name))
                    .add(ServiceCol::Active.eq(true)),
            )
            .one(&self.orm)
            .await?
            .map(service_from_entity)
            .transpose()
    }

    async fn list_services(&self, active_only: bool) -> AppResult<Vec<Service>> {
        let mut finder = Services::find();
        if active_only {
            finder = finder.filter(ServiceCol::Active.eq(true));
        }

        finder
            .order_by_asc(ServiceCol::BasePrice)
            .order_by_asc(ServiceCol::Name)
            .all(&self.orm)
            .await?
            .into_iter()
            .map(service_from_entity)
            .collect()
    }

    async fn create_service(&self, service: NewService) -> AppResult<Service> {
        let created = ServiceActive {
            id: Set(Uuid::new_v4()),
            name: Set(service.name),
            description: Set(service.description),
            base_price: Set(service.base_price),
            duration: Set(service.duration),
            vehicle_types: Set(service.vehicle_types),
            category: Set(service.category.as_str().to_string()),
            features: Set(service.features),
            image_url: Set(service.image_url),
            active: Set(service.active),
            created_at: NotSet,
            updated_at: NotSet,
        }
        .insert(&self.orm)
        .await
        .map_err(map_db_err)?;

        service_from_entity(created)
    }

    async fn update_service(&self, id: Uuid, changes: ServiceChanges) -> AppResult<Service> {
        let existing = Services::find_by_id(id).one(&self.orm).await?;
        let existing = match existing {
            Some(s) => s,
            None => return Err(AppError::NotFound("Service")),
        };

        let mut active: ServiceActive = existing.into();
        if let Some(name) = changes.name {
            active.name = Set(name);
        }
        if let Some(description) = changes.description {
            active.description = Set(description);
        }
        if let Some(base_price) = changes.base_price {
            active.base_price = Set(base_price);
        }
        if let Some(duration) = changes.duration {
            active.duration = Set(duration);
        }
        if let Some(vehicle_types) = changes.vehicle_types {
            active.vehicle_types = Set(vehicle_types);
        }
        if let Some(category) = changes.category {
            active.category = Set(category.as_str().to_string());
        }
        if let Some(features) = changes.features {
            active.features = Set(features);
        }
        if let Some(image_url) = changes.image_url {
            active.image_url = Set(Some(image_url));
        }
        if let Some(flag) = changes.active {
            active.active = Set(flag);
        }
        active.updated_at = Set(Utc::now().into());

        let service = active.update(&self.orm).await.map_err(map_db_err)?;
        service_from_entity(service)
    }

    async fn create_booking(&self, booking: NewBooking) -> AppResult<Booking> {
        let created = BookingActive {
            id: Set(Uuid::new_v4()),
            customer_id: Set(booking.customer_id),
            date: Set(booking.date),
            time: Set(booking.time),
            service_type: Set(booking.service_type),
            vehicle_type: Set(booking.vehicle_type),
            vehicle_year: Set(booking.vehicle_year),
            vehicle_make: Set(booking.vehicle_make),
            vehicle_model: Set(booking.vehicle_model),
            condition: Set(booking.condition),
            extras: Set(booking.extras),
            appointment_type: Set(booking.appointment_type.as_str().to_string()),
            total_price: Set(booking.total_price),
            status: Set(BookingStatus::Pending.as_str().to_string()),
            payment_method: Set(booking.payment_method.map(|m| m.as_str().to_string())),
            payment_status: Set(PaymentStatus::Pending.as_str().to_string()),
            notes: Set(booking.notes),
            reference_number: Set(booking.reference_number),
            version: Set(0),
            created_at: NotSet,
            updated_at: NotSet,
        }
        .insert(&self.orm)
        .await
        .map_err(map_db_err)?;

        booking_from_entity(created)
    }

    async fn find_booking(&self, id: Uuid) -> AppResult<Option<Booking>> {
        Bookings::find_by_id(id)
            .one(&self.orm)
            .await?
            .map(booking_from_entity)
            .transpose()
    }

    async fn find_booking_by_reference(&self, reference: &str) -> AppResult<Option<Booking>> {
        Bookings::find()
            .filter(BookingCol::ReferenceNumber.eq(reference))
            .one(&self.orm)
            .await?
            .map(booking_from_entity)
            .transpose()
    }

    async fn update_booking(&self, booking: &Booking) -> AppResult<Booking> {
        write_booking(&self.orm, booking).await
    }

    async fn complete_booking(
        &self,
        booking: &Booking,
        points: i32,
        amount: Decimal,
    ) -> AppResult<(Booking, Customer)> {
        let txn = self.orm.begin().await?;
        let updated = write_booking(&txn, booking).await?;
        let customer = credit_customer(&txn, updated.customer_id, points, amount).await?;
        txn.commit().await?;
        Ok((updated, customer))
    }

    async fn query_bookings(
        &self,
        filter: &BookingFilter,
        page: Page,
        order: BookingOrder,
    ) -> AppResult<Vec<Booking>> {
        let mut finder = Bookings::find().filter(booking_condition(filter));
        finder = match order {
            BookingOrder::DateDesc => finder
                .order_by_desc(BookingCol::Date)
                .order_by_desc(BookingCol::CreatedAt),
            BookingOrder::DateAsc => finder
                .order_by_asc(BookingCol::Date)
                .order_by_asc(BookingCol::CreatedAt),
        };

        finder
            .limit(page.limit)
            .offset(page.offset)
            .all(&self.orm)
            .await?
            .into_iter()
            .map(booking_from_entity)
            .collect()
    }

    async fn count_bookings(&self, filter: &BookingFilter) -> AppResult<u64> {
        let total = Bookings::find()
            .filter(booking_condition(filter))
            .count(&self.orm)
            .await?;
        Ok(total)
    }

    async fn sum_total_price(&self, filter: &BookingFilter) -> AppResult<Decimal> {
        let total: Option<Option<Decimal>> = Bookings::find()
            .select_only()
            .column_as(Expr::col(BookingCol::TotalPrice).sum(), "total")
            .filter(booking_condition(filter))
            .into_tuple()
            .one(&self.orm)
            .await?;

        Ok(total.flatten().unwrap_or(Decimal::ZERO))
    }

    async fn record_audit(&self, entry: AuditEntry) -> AppResult<()> {
        log_audit(&self.pool, &entry).await
    }
}

/// Version-guarded write of the mutable booking columns.
async fn write_booking<C: ConnectionTrait>(conn: &C, booking: &Booking) -> AppResult<Booking> {
    let result = Bookings::update_many()
        .col_expr(BookingCol::Status, Expr::value(booking.status.as_str()))
        .col_expr(
            BookingCol::PaymentStatus,
            Expr::value(booking.payment_status.as_str()),
        )
        .col_expr(
            BookingCol::PaymentMethod,
            Expr::value(booking.payment_method.map(|m| m.as_str().to_string())),
        )
        .col_expr(BookingCol::Notes, Expr::value(booking.notes.clone()))
        .col_expr(BookingCol::Version, Expr::col(BookingCol::Version).add(1))
        .col_expr(BookingCol::UpdatedAt, Expr::value(Utc::now()))
        .filter(BookingCol::Id.eq(booking.id))
        .filter(BookingCol::Version.eq(booking.version))
        .exec(conn)
        .await
        .map_err(map_db_err)?;

    let stored = Bookings::find_by_id(booking.id)
        .one(conn)
        .await?
        .map(booking_from_entity)
        .transpose()?;

    match stored {
        Some(_) if result.rows_affected == 0 => Err(AppError::Conflict(Conflict::StaleBooking)),
        Some(updated) => Ok(updated),
        None => Err(AppError::NotFound("Booking")),
    }
}

/// Adds to the loyalty and spend counters with a single `UPDATE`.
async fn credit_customer<C: ConnectionTrait>(
    conn: &C,
    id: Uuid,
    points: i32,
    amount: Decimal,
) -> AppResult<Customer> {
    let result = Customers::update_many()
        .col_expr(
            CustomerCol::LoyaltyPoints,
            Expr::col(CustomerCol::LoyaltyPoints).add(points),
        )
        .col_expr(
            CustomerCol::TotalSpent,
            Expr::col(CustomerCol::TotalSpent).add(amount),
        )
        .col_expr(CustomerCol::UpdatedAt, Expr::value(Utc::now()))
        .filter(CustomerCol::Id.eq(id))
        .exec(conn)
        .await?;

    if result.rows_affected == 0 {
        return Err(AppError::NotFound("Customer"));
    }

    Customers::find_by_id(id)
        .one(conn)
        .await?
        .map(customer_from_entity)
        .ok_or(AppError::NotFound("Customer"))
}

fn booking_condition(filter: &BookingFilter) -> Condition {
    let mut condition = Condition::all();
    if let Some(statuses) = filter.statuses.as_ref() {
        condition = condition.add(BookingCol::Status.is_in(statuses.iter().map(|s| s.as_str())));
    }
    if let Some(payment_status) = filter.payment_status {
        condition = condition.add(BookingCol::PaymentStatus.eq(payment_status.as_str()));
    }
    if let Some(customer_id) = filter.customer_id {
        condition = condition.add(BookingCol::CustomerId.eq(customer_id));
    }
    if let Some(date) = filter.date {
        condition = condition.add(BookingCol::Date.eq(date));
    }
    if let Some(from) = filter.date_from {
        condition = condition.add(BookingCol::Date.gte(from));
    }
    if let Some(to) = filter.date_to {
        condition = condition.add(BookingCol::Date.lte(to));
    }
    if let Some(time) = filter.time.as_ref() {
        condition = condition.add(BookingCol::Time.eq(time.clone()));
    }
    condition
}

/// Unique violations become typed conflicts; everything else stays an ORM error.
/// `ILIKE` pattern matching `search` as a literal substring.
fn contains_pattern(search: &str) -> String {
    let mut pattern = String::with_capacity(search.len() + 2);
    pattern.push('%');
    for ch in search.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('%');
    pattern
}

fn map_db_err(err: DbErr) -> AppError {
    let conflict = match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(message)) => conflict_from_message(&message),
        _ => None,
    };
    match conflict {
        Some(conflict) => AppError::Conflict(conflict),
        None => AppError::OrmError(err),
    }
}

fn conflict_from_message(message: &str) -> Option<Conflict> {
    if message.contains("bookings_active_slot_key") {
        Some(Conflict::Slot)
    } else if message.contains("bookings_reference_number_key") {
        Some(Conflict::ReferenceNumber)
    } else if message.contains("customers_email_key") {
        Some(Conflict::Email)
    } else if message.contains("services_name_key") {
        Some(Conflict::ServiceName)
    } else {
        None
    }
}

fn corrupt(column: &str, value: &str) -> AppError {
    AppError::Internal(anyhow::anyhow!("unexpected {column} value '{value}'"))
}

fn customer_from_entity(model: CustomerModel) -> Customer {
    Customer {
        id: model.id,
        name: model.name,
        email: model.email,
        phone: model.phone,
        address: model.address,
        loyalty_points: model.loyalty_points,
        total_spent: model.total_spent,
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    }
}

fn service_from_entity(model: ServiceModel) -> AppResult<Service> {
    let category = ServiceCategory::parse(&model.category)
        .ok_or_else(|| corrupt("category", &model.category))?;
    Ok(Service {
        id: model.id,
        name: model.name,
        description: model.description,
        base_price: model.base_price,
        duration: model.duration,
        vehicle_types: model.vehicle_types,
        category,
        features: model.features,
        image_url: model.image_url,
        active: model.active,
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    })
}

fn booking_from_entity(model: BookingModel) -> AppResult<Booking> {
    let status =
        BookingStatus::parse(&model.status).ok_or_else(|| corrupt("status", &model.status))?;
    let payment_status = PaymentStatus::parse(&model.payment_status)
        .ok_or_else(|| corrupt("payment_status", &model.payment_status))?;
    let appointment_type = AppointmentType::parse(&model.appointment_type)
        .ok_or_else(|| corrupt("appointment_type", &model.appointment_type))?;
    let payment_method = match model.payment_method.as_deref() {
        Some(raw) => Some(PaymentMethod::parse(raw).ok_or_else(|| corrupt("payment_method", raw))?),
        None => None,
    };

    Ok(Booking {
        id: model.id,
        customer_id: model.customer_id,
        date: model.date,
        time: model.time,
        service_type: model.service_type,
        vehicle_type: model.vehicle_type,
        vehicle_year: model.vehicle_year,
        vehicle_make: model.vehicle_make,
        vehicle_model: model.vehicle_model,
        condition: model.condition,
        extras: model.extras,
        appointment_type,
        total_price: model.total_price,
        status,
        payment_method,
        payment_status,
        notes: model.notes,
        reference_number: model.reference_number,
        version: model.version,
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    })
}
