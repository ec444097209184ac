use utoipa::{OpenApi, openapi::OpenApi as OpenApiSpec};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        bookings::{
            BookingList, BookingStats, BookingTransition, CancelBookingRequest,
            CreateBookingRequest, SlotAvailability, UpdatePaymentRequest, UpdateStatusRequest,
        },
        customers::{
            BookingSummary, CustomerList, CustomerStats, CustomerSummary, CustomerWithBookings,
            LastBooking, UpdateCustomerRequest,
        },
        services::{
            CreateServiceRequest, PricePreview, PricePreviewRequest, ServiceList,
            UpdateServiceRequest,
        },
    },
    models::{
        AppointmentType, Booking, BookingDetail, BookingStatus, Customer, PaymentMethod,
        PaymentStatus, Service, ServiceCategory,
    },
    pricing::PriceQuote,
    response::{ApiResponse, Meta},
    routes::{bookings, customers, health, services},
};

#[derive(OpenApi)]
#[openapi(
    info(title = "AquaGlow Bookings API"),
    paths(
        health::health_check,
        bookings::create_booking,
        bookings::list_bookings,
        bookings::booking_stats,
        bookings::available_slots,
        bookings::get_booking_by_reference,
        bookings::get_booking,
        bookings::update_status,
        bookings::update_payment,
        bookings::cancel_booking,
        customers::list_customers,
        customers::search_customers,
        customers::get_customer_by_email,
        customers::get_customer,
        customers::update_customer,
        customers::customer_stats,
        services::list_services,
        services::create_service,
        services::get_service,
        services::update_service,
        services::delete_service,
        services::calculate_price
    ),
    components(
        schemas(
            Booking,
            BookingDetail,
            BookingStatus,
            PaymentStatus,
            PaymentMethod,
            AppointmentType,
            Customer,
            Service,
            ServiceCategory,
            PriceQuote,
            CreateBookingRequest,
            UpdateStatusRequest,
            UpdatePaymentRequest,
            CancelBookingRequest,
            BookingList,
            BookingTransition,
            SlotAvailability,
            BookingStats,
            UpdateCustomerRequest,
            CustomerList,
            CustomerWithBookings,
            CustomerSummary,
            BookingSummary,
            LastBooking,
            CustomerStats,
            CreateServiceRequest,
            UpdateServiceRequest,
            ServiceList,
            PricePreviewRequest,
            PricePreview,
            Meta,
            ApiResponse<Service>,
            ApiResponse<BookingDetail>,
            ApiResponse<BookingList>,
            ApiResponse<CustomerList>
        )
    ),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Bookings", description = "Booking lifecycle endpoints"),
        (name = "Customers", description = "Customer endpoints"),
        (name = "Services", description = "Service catalog and price preview"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
