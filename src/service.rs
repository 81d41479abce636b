//! Minimal `Service` abstraction the registry boxes instantiators and finalizers into,
//! so they can be cloned out of the registry and called without holding its lock.

use alloc::boxed::Box;

pub(crate) trait Service<Request> {
    type Response;
    type Error;

    fn call(&mut self, request: Request) -> Result<Self::Response, Self::Error>;
}

#[inline]
#[must_use]
pub(crate) const fn service_fn<F>(f: F) -> ServiceFn<F> {
    ServiceFn { f }
}

#[derive(Clone)]
pub(crate) struct ServiceFn<F> {
    f: F,
}

impl<F, Request, Response, Error> Service<Request> for ServiceFn<F>
where
    F: FnMut(Request) -> Result<Response, Error>,
{
    type Response = Response;
    type Error = Error;

    #[inline]
    fn call(&mut self, request: Request) -> Result<Self::Response, Self::Error> {
        (self.f)(request)
    }
}

type BoxCloneServiceInner<Request, Response, Error> = Box<dyn CloneService<Request, Response = Response, Error = Error> + Send + Sync>;

pub(crate) struct BoxCloneService<Request, Response, Error>(BoxCloneServiceInner<Request, Response, Error>);

impl<Request, Response, Error> BoxCloneService<Request, Response, Error> {
    #[inline]
    #[must_use]
    pub(crate) fn new<S>(service: S) -> Self
    where
        S: Service<Request, Response = Response, Error = Error> + Clone + Send + Sync + 'static,
    {
        Self(Box::new(service))
    }
}

pub(crate) trait CloneService<Request>: Service<Request> {
    #[must_use]
    fn clone_box(&self) -> BoxCloneServiceInner<Request, Self::Response, Self::Error>;
}

impl<Request, T> CloneService<Request> for T
where
    T: Service<Request> + Clone + Send + Sync + 'static,
{
    #[inline]
    fn clone_box(&self) -> BoxCloneServiceInner<Request, T::Response, T::Error> {
        Box::new(self.clone())
    }
}

impl<Request, Response, Error> Clone for BoxCloneService<Request, Response, Error> {
    #[inline]
    fn clone(&self) -> Self {
        Self(self.0.clone_box())
    }
}

impl<Request, Response, Error> Service<Request> for BoxCloneService<Request, Response, Error> {
    type Response = Response;
    type Error = Error;

    #[inline]
    fn call(&mut self, request: Request) -> Result<Self::Response, Self::Error> {
        self.0.call(request)
    }
}

#[cfg(test)]
mod tests {
    use core::convert::Infallible;

    use super::{service_fn, BoxCloneService, Service as _};

    #[derive(Clone, Copy)]
    struct Request(u8);
    struct Response(u8);

    #[test]
    fn test_service() {
        let mut service = service_fn(|Request(val)| Ok::<_, Infallible>(Response(val)));

        let response = service.call(Request(1)).unwrap();

        assert_eq!(response.0, 1);
    }

    #[test]
    fn test_boxed_clone_keeps_state_per_clone() {
        let mut calls = 0u8;
        let mut service = BoxCloneService::new(service_fn(move |Request(val)| {
            calls += 1;
            Ok::<_, Infallible>(Response(val + calls))
        }));
        let mut cloned = service.clone();

        assert_eq!(service.call(Request(0)).unwrap().0, 1);
        assert_eq!(service.call(Request(0)).unwrap().0, 2);
        assert_eq!(cloned.call(Request(0)).unwrap().0, 1);
    }
}
